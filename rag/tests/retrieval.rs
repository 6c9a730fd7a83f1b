//! End-to-end retrieval scenarios across collections.

use std::sync::Arc;

use confidant_rag::index::cosine_similarity;
use confidant_rag::{
    CONTEXT_HEADER, CollectionKind, CollectionRegistry, ContextAssembler, Document,
    IndexStrategy, KnowledgeLoader, KnowledgePackage, MergedResult, Metadata, RagConfig,
    RetrievalMerger, VectorStore,
};

fn merged(id: &str, text: &str, score: f32, kind: CollectionKind) -> MergedResult {
    MergedResult {
        document_id: id.to_string(),
        score,
        text: text.to_string(),
        metadata: Metadata::new(),
        collection: match kind {
            CollectionKind::Shared => "shared_knowledge".to_string(),
            CollectionKind::Personal => "user_1".to_string(),
        },
        kind,
    }
}

fn five_documents() -> Vec<Document> {
    vec![
        Document::new("d1", "Walking after meals steadies blood sugar.", vec![0.9, 0.1, 0.0, 0.2]),
        Document::new("d2", "Journaling can ease anxious thoughts.", vec![0.1, 0.8, 0.3, 0.0]),
        Document::new("d3", "Deep breathing slows the heart rate.", vec![0.4, 0.4, 0.4, 0.4]),
        Document::new("d4", "Caffeine late in the day disrupts sleep.", vec![0.0, 0.2, 0.9, 0.1]),
        Document::new(
            "d5",
            "Sunlight in the morning anchors the body clock.",
            vec![0.3, 0.0, 0.5, 0.8],
        ),
    ]
}

#[test]
fn linear_search_matches_brute_force_ranking() {
    let store = VectorStore::new("shared_knowledge", CollectionKind::Shared, IndexStrategy::Linear);
    store.initialize(4);
    store.add_documents(five_documents()).unwrap();

    let query = [0.5, 0.3, 0.6, 0.1];
    let mut expected: Vec<(String, f32)> = five_documents()
        .into_iter()
        .map(|doc| {
            let score = cosine_similarity(&query, &doc.embedding);
            (doc.id, score)
        })
        .collect();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1));

    let hits = store.search(&query, 5, None).unwrap();
    assert_eq!(hits.len(), 5);
    for (hit, (id, score)) in hits.iter().zip(&expected) {
        assert_eq!(&hit.document_id, id);
        assert!((hit.score - score).abs() < 1e-6);
    }
}

#[test]
fn exact_embedding_scores_one() {
    for strategy in [IndexStrategy::Linear, IndexStrategy::Auto] {
        let store = VectorStore::new("shared_knowledge", CollectionKind::Shared, strategy);
        store.initialize(4);
        store.add_documents(five_documents()).unwrap();

        for doc in five_documents() {
            let hits = store.search(&doc.embedding, 1, None).unwrap();
            assert_eq!(hits[0].document_id, doc.id, "{strategy:?}");
            assert!((hits[0].score - 1.0).abs() < 1e-4, "{strategy:?}");
        }
    }
}

#[test]
fn merged_order_follows_score_across_tiers() {
    let merger = RetrievalMerger::new();
    let results = merger.merge(vec![
        vec![merged("g1", "Exercise helps mood", 0.9, CollectionKind::Shared)],
        vec![merged("entry_1", "Patient reports anxiety", 0.75, CollectionKind::Personal)],
    ]);

    let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, ["g1", "entry_1"]);
}

#[test]
fn threshold_excludes_weak_matches() {
    let merger = RetrievalMerger::new();
    let results = merger.merge(vec![vec![
        merged("a", "strong", 0.31, CollectionKind::Shared),
        merged("b", "weak", 0.29, CollectionKind::Shared),
        merged("c", "weaker", 0.05, CollectionKind::Shared),
    ]]);
    assert!(results.iter().all(|r| r.score >= 0.3));
    assert_eq!(results.len(), 1);
}

#[test]
fn near_duplicates_collapse_to_the_higher_score() {
    let text = "Regular physical activity has been shown to reduce symptoms of depression.";
    let merger = RetrievalMerger::new();
    let results = merger.deduplicate(vec![
        merged("x", text, 0.83, CollectionKind::Shared),
        merged("y", text, 0.81, CollectionKind::Shared),
    ]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_id, "x");
}

#[test]
fn assembled_context_respects_budget() {
    let long = "Sleep hygiene covers many habits. ".repeat(40);
    let results: Vec<MergedResult> = (0..6)
        .map(|i| {
            let kind = if i % 2 == 0 {
                CollectionKind::Personal
            } else {
                CollectionKind::Shared
            };
            merged(&format!("doc_{i}"), &long, 0.95 - 0.1 * i as f32, kind)
        })
        .collect();

    let context = ContextAssembler::new().assemble(&results, 800);
    assert!(context.starts_with(CONTEXT_HEADER));
    assert!(context.chars().count() <= 800 + CONTEXT_HEADER.chars().count());
}

#[tokio::test]
async fn imported_package_and_personal_entries_retrieve_together() {
    let registry = Arc::new(CollectionRegistry::with_config(
        2,
        RagConfig::builder().index_strategy(IndexStrategy::Linear).build(),
    ));
    let shared = registry.shared_or_create();

    let package = KnowledgePackage::from_slice(
        br#"{
            "manifest": {"version": "1.0", "name": "mood", "documentCount": 2, "embeddingDimension": 2},
            "documents": [
                {"id": "g1", "text": "Exercise helps mood", "metadata": {"category": "exercise"}},
                {"id": "g2", "text": "Hydration supports focus", "metadata": {"category": "nutrition"}}
            ],
            "embeddings": [[1.0, 0.0], [0.0, 1.0]]
        }"#,
    )
    .unwrap();
    let loaded = KnowledgeLoader::default().load(&shared, package, |_| {}).unwrap();
    assert_eq!(loaded, 2);

    let personal = registry
        .create(
            &CollectionRegistry::personal_collection_name("42"),
            CollectionKind::Personal,
        )
        .unwrap();
    personal
        .add_document(
            Document::new("entry_1", "Felt calmer after an evening run", vec![0.8, 0.6])
                .with_metadata("source", "personal"),
        )
        .unwrap();

    let results = RetrievalMerger::new()
        .retrieve(&registry.collections(), &[1.0, 0.0])
        .await;
    let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, ["g1", "entry_1"]);

    let context = ContextAssembler::new().assemble(&results, 800);
    let personal_line = context.find("Felt calmer").unwrap();
    let shared_line = context.find("Exercise helps mood").unwrap();
    assert!(personal_line < shared_line);
}

//! # confidant-rag
//!
//! Multi-collection retrieval and context assembly for offline assistants.
//!
//! A query flows through the crate like this:
//!
//! ```text
//! query ─▶ ResponseCache ──hit──────────────────────────────────────────▶ answer
//!            │ miss
//!            ▼
//!        EmbeddingProvider ─▶ RetrievalMerger ─▶ ContextAssembler ─▶ GenerationProvider
//!                               │ fan-out over
//!                               ▼
//!                      CollectionRegistry: shared_knowledge, user_{id}, ...
//! ```
//!
//! | Component | Type | Description |
//! |-----------|------|-------------|
//! | **Collections** | [`VectorStore`] | Documents plus an ANN or linear index, one per collection |
//! | **Registry** | [`CollectionRegistry`] | Named collections sharing one embedding dimension |
//! | **Merging** | [`RetrievalMerger`] | Parallel search, threshold, dedup, cap |
//! | **Context** | [`ContextAssembler`] | Personal-first, score-weighted context under a budget |
//! | **Cache** | [`ResponseCache`] | Per-language answers for common queries |
//! | **Import** | [`KnowledgeLoader`] | Batch import of precomputed knowledge packages |
//! | **Pipeline** | [`Assistant`] | All of the above plus generation and history |
//!
//! # Example
//!
//! ```rust
//! use confidant_rag::{CollectionKind, CollectionRegistry, Document, RetrievalMerger};
//!
//! # futures::executor::block_on(async {
//! let registry = CollectionRegistry::new(2);
//! let shared = registry.create("shared_knowledge", CollectionKind::Shared)?;
//! shared.add_document(Document::new("g1", "Exercise helps mood", vec![1.0, 0.0]))?;
//!
//! let personal = registry.create("user_1", CollectionKind::Personal)?;
//! personal.add_document(Document::new("entry_1", "I felt better after running", vec![0.9, 0.1]))?;
//!
//! let results = RetrievalMerger::new()
//!     .retrieve(&registry.collections(), &[1.0, 0.0])
//!     .await;
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[0].document_id, "g1");
//! # Ok::<(), confidant_rag::RagError>(())
//! # })?;
//! # Ok::<(), confidant_rag::RagError>(())
//! ```

mod assistant;
/// Response cache for common queries.
pub mod cache;
mod config;
mod context;
mod error;
/// Index strategies behind each collection.
pub mod index;
mod loader;
mod merge;
/// Durable store backends and collection snapshots.
pub mod persistence;
/// Prompt composition and response cleanup.
pub mod prompt;
mod registry;
mod store;
/// Documents, metadata and search results.
pub mod types;

pub use assistant::{Assistant, AssistantResponse};
pub use cache::{CacheEntry, CacheState, CacheStats, ResponseCache, normalize};
pub use config::{IndexStrategy, RagConfig, RagConfigBuilder};
pub use context::{CONTEXT_HEADER, ContextAssembler, score_allowance, truncate_passage};
pub use error::{RagError, Result};
pub use loader::{
    KnowledgeLoader, KnowledgePackage, LoadProgress, LoadStage, PackageDocument, PackageManifest,
};
pub use merge::RetrievalMerger;
pub use registry::{CollectionRegistry, SHARED_COLLECTION};
pub use store::VectorStore;
pub use types::{
    CollectionKind, Document, MergedResult, Metadata, MetadataFilter, MetadataValue,
    SearchResult, StoreStats,
};

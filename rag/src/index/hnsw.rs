//! HNSW-based vector index using instant-distance.

use std::collections::HashMap;

use instant_distance::{Builder, HnswMap, Point, Search};
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::config::IndexStrategy;
use crate::types::{MetadataFilter, SearchResult};

use super::{AnnIndex, SlotArena, cosine_similarity};

/// Graph construction breadth.
const EF_CONSTRUCTION: usize = 200;
/// Fixed seed so rebuilds of the same vectors produce the same graph.
const GRAPH_SEED: u64 = 0x5eed;

/// A point wrapper for instant-distance that stores an embedding vector.
#[derive(Clone, Debug)]
struct EmbeddingPoint {
    embedding: Vec<f32>,
}

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance: smaller is more similar.
        1.0 - cosine_similarity(&self.embedding, &other.embedding)
    }
}

/// Approximate nearest-neighbour index over an HNSW graph.
///
/// `instant-distance` graphs are immutable, so inserts and removals only touch the vector
/// table and mark the index stale. The owning collection calls [`AnnIndex::rebuild`] under its
/// write lock before serving the next search.
///
/// Capacity starts at the configured value and doubles whenever it is exceeded; it only
/// influences logging and preallocation, never correctness.
pub struct HnswIndex {
    vectors: Vec<(u32, Vec<f32>)>,
    positions: HashMap<u32, usize>,
    graph: Option<HnswMap<EmbeddingPoint, u32>>,
    stale: bool,
    capacity: usize,
    ef_search: usize,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("len", &self.vectors.len())
            .field("capacity", &self.capacity)
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

impl HnswIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(initial_capacity: usize, ef_search: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            vectors: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            graph: None,
            stale: false,
            capacity,
            ef_search: ef_search.max(1),
        }
    }

    /// Current capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl AnnIndex for HnswIndex {
    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::Hnsw
    }

    fn insert(&mut self, label: u32, embedding: &[f32]) {
        if let Some(&position) = self.positions.get(&label) {
            self.vectors[position].1 = embedding.to_vec();
        } else {
            if self.vectors.len() >= self.capacity {
                let previous = self.capacity;
                self.capacity = previous.saturating_mul(2);
                self.vectors.reserve(self.capacity - self.vectors.len());
                debug!(from = previous, to = self.capacity, "growing HNSW index capacity");
            }
            self.positions.insert(label, self.vectors.len());
            self.vectors.push((label, embedding.to_vec()));
        }
        self.stale = true;
    }

    fn remove(&mut self, label: u32) {
        let Some(position) = self.positions.remove(&label) else {
            return;
        };
        self.vectors.swap_remove(position);
        if let Some((moved, _)) = self.vectors.get(position) {
            self.positions.insert(*moved, position);
        }
        self.stale = true;
    }

    fn is_stale(&self) -> bool {
        self.stale
    }

    fn rebuild(&mut self) {
        self.stale = false;
        if self.vectors.is_empty() {
            self.graph = None;
            return;
        }

        let (labels, points): (Vec<u32>, Vec<EmbeddingPoint>) = self
            .vectors
            .iter()
            .map(|(label, embedding)| {
                (
                    *label,
                    EmbeddingPoint {
                        embedding: embedding.clone(),
                    },
                )
            })
            .unzip();

        debug!(points = points.len(), "rebuilding HNSW graph");
        self.graph = Some(
            Builder::default()
                .ef_construction(EF_CONSTRUCTION)
                .ef_search(self.ef_search)
                .seed(GRAPH_SEED)
                .build(points, labels),
        );
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        arena: &SlotArena,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        let Some(graph) = &self.graph else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let query_point = EmbeddingPoint {
            embedding: query.to_vec(),
        };
        let mut search = Search::default();

        let mut results: Vec<SearchResult> = graph
            .search(&query_point, &mut search)
            .take(k)
            .filter_map(|candidate| {
                let doc = arena.get(*candidate.value)?;
                Some(SearchResult {
                    document_id: doc.id.clone(),
                    score: 1.0 - candidate.distance,
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                })
            })
            .filter(|result| filter.is_none_or(|filter| filter.matches(&result.metadata)))
            .collect();

        results.sort_by_key(|r| std::cmp::Reverse(OrderedFloat(r.score)));
        results
    }

    fn indexed_count(&self) -> usize {
        self.vectors.len()
    }

    fn clear(&mut self) {
        self.vectors.clear();
        self.positions.clear();
        self.graph = None;
        self.stale = false;
    }
}

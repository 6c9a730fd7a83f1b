//! Exhaustive cosine scan.

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::config::IndexStrategy;
use crate::types::{MetadataFilter, SearchResult};

use super::{AnnIndex, SlotArena, cosine_similarity};

/// Exact search that scores every live slot.
///
/// Holds no state of its own: the arena is the index. Results are identical to a brute-force
/// cosine ranking over the collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScanIndex;

impl LinearScanIndex {
    /// Creates a linear scan index.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AnnIndex for LinearScanIndex {
    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::Linear
    }

    fn insert(&mut self, _label: u32, _embedding: &[f32]) {}

    fn remove(&mut self, _label: u32) {}

    fn is_stale(&self) -> bool {
        false
    }

    fn rebuild(&mut self) {}

    fn search(
        &self,
        query: &[f32],
        k: usize,
        arena: &SlotArena,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        if k == 0 || arena.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<SearchResult> = arena
            .slots()
            .par_iter()
            .filter_map(Option::as_ref)
            .filter(|doc| filter.is_none_or(|filter| filter.matches(&doc.metadata)))
            .map(|doc| SearchResult {
                document_id: doc.id.clone(),
                score: cosine_similarity(query, &doc.embedding),
                text: doc.text.clone(),
                metadata: doc.metadata.clone(),
            })
            .collect();

        scored.par_sort_by_key(|r| std::cmp::Reverse(OrderedFloat(r.score)));
        scored.truncate(k);
        scored
    }

    fn indexed_count(&self) -> usize {
        0
    }

    fn clear(&mut self) {}
}

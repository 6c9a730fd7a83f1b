//! Vector index strategies.
//!
//! A collection keeps its documents in a [`SlotArena`] and delegates nearest-neighbour lookup to
//! an [`AnnIndex`]. Two strategies exist:
//!
//! - [`HnswIndex`]: approximate search over an HNSW graph (cargo feature `hnsw`, on by default).
//! - [`LinearScanIndex`]: exact cosine scan over every live slot.
//!
//! The strategy is chosen once per collection by [`IndexStrategy::probe`].

mod arena;
#[cfg(feature = "hnsw")]
mod hnsw;
mod linear;

pub use arena::{Placement, SlotArena};
#[cfg(feature = "hnsw")]
pub use hnsw::HnswIndex;
pub use linear::LinearScanIndex;

use std::fmt;

use tracing::info;

use crate::config::{IndexStrategy, RagConfig};
use crate::types::{MetadataFilter, SearchResult};

/// Nearest-neighbour index over the vectors of a [`SlotArena`].
///
/// The index only ever sees labels. Resolving a label back to its document goes through the
/// arena passed to [`search`](AnnIndex::search).
pub trait AnnIndex: Send + Sync + fmt::Debug {
    /// Strategy implemented by this index.
    fn strategy(&self) -> IndexStrategy;

    /// Adds the vector stored under `label`.
    fn insert(&mut self, label: u32, embedding: &[f32]);

    /// Forgets the vector stored under `label`.
    fn remove(&mut self, label: u32);

    /// Returns `true` if [`rebuild`](AnnIndex::rebuild) must run before the next search.
    fn is_stale(&self) -> bool;

    /// Brings the search structure up to date with inserts and removals.
    fn rebuild(&mut self);

    /// Returns at most `k` results ranked by descending similarity.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        arena: &SlotArena,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchResult>;

    /// Number of vectors held by the index structure.
    fn indexed_count(&self) -> usize;

    /// Drops every vector.
    fn clear(&mut self);
}

impl IndexStrategy {
    /// Resolves the requested strategy to one that is available in this build.
    ///
    /// Never returns [`IndexStrategy::Auto`]. Missing ANN support is not an error: the
    /// collection falls back to a linear scan.
    #[must_use]
    pub fn probe(self) -> Self {
        match self {
            Self::Linear => Self::Linear,
            Self::Auto | Self::Hnsw if cfg!(feature = "hnsw") => Self::Hnsw,
            Self::Auto | Self::Hnsw => {
                info!("ANN index not compiled in, falling back to linear scan");
                Self::Linear
            }
        }
    }
}

/// Creates an empty index for a strategy returned by [`IndexStrategy::probe`].
#[must_use]
#[cfg_attr(not(feature = "hnsw"), allow(unused_variables))]
pub fn build_index(strategy: IndexStrategy, config: &RagConfig) -> Box<dyn AnnIndex> {
    match strategy.probe() {
        #[cfg(feature = "hnsw")]
        IndexStrategy::Hnsw => Box::new(HnswIndex::new(
            config.ann_initial_capacity,
            config.ann_ef_search,
        )),
        _ => Box::new(LinearScanIndex::new()),
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns 0 when either vector has zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, -0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn probe_never_returns_auto() {
        assert_ne!(IndexStrategy::Auto.probe(), IndexStrategy::Auto);
        assert_eq!(IndexStrategy::Linear.probe(), IndexStrategy::Linear);
    }

    #[cfg(feature = "hnsw")]
    #[test]
    fn auto_prefers_hnsw_when_compiled_in() {
        assert_eq!(IndexStrategy::Auto.probe(), IndexStrategy::Hnsw);
        let index = build_index(IndexStrategy::Auto, &RagConfig::default());
        assert_eq!(index.strategy(), IndexStrategy::Hnsw);
    }

    #[test]
    fn linear_request_builds_linear_index() {
        let index = build_index(IndexStrategy::Linear, &RagConfig::default());
        assert_eq!(index.strategy(), IndexStrategy::Linear);
        assert_eq!(index.indexed_count(), 0);
    }
}

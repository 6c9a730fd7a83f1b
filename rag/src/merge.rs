//! Fan-out search across collections, then threshold, deduplicate and cap.

use std::sync::Arc;

use futures::future::join_all;
use ordered_float::OrderedFloat;
use tracing::warn;

use crate::config::RagConfig;
use crate::store::VectorStore;
use crate::types::MergedResult;

/// Combines per-collection results into one ranked list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalMerger {
    threshold: f32,
    max_results: usize,
    per_collection_limit: usize,
    duplicate_score_delta: f32,
    duplicate_prefix_chars: usize,
}

impl Default for RetrievalMerger {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl RetrievalMerger {
    /// Creates a merger with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a merger from configuration.
    #[must_use]
    pub const fn from_config(config: &RagConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            max_results: config.max_results,
            per_collection_limit: config.per_collection_limit,
            duplicate_score_delta: config.duplicate_score_delta,
            duplicate_prefix_chars: config.duplicate_prefix_chars,
        }
    }

    /// Searches every collection concurrently.
    ///
    /// Returns one result set per collection, in input order. A collection whose search fails
    /// is logged and contributes an empty set.
    pub async fn query_multiple(
        &self,
        collections: &[Arc<VectorStore>],
        query: &[f32],
        per_collection_limit: usize,
    ) -> Vec<Vec<MergedResult>> {
        join_all(collections.iter().map(|collection| async move {
            match collection.search(query, per_collection_limit, None) {
                Ok(results) => results
                    .into_iter()
                    .map(|result| {
                        MergedResult::from_search(result, collection.name(), collection.kind())
                    })
                    .collect(),
                Err(error) => {
                    warn!(collection = %collection.name(), %error, "collection search failed");
                    Vec::new()
                }
            }
        }))
        .await
    }

    /// Concatenates result sets, drops results below the threshold, sorts by descending score
    /// and caps the list.
    #[must_use]
    pub fn merge(&self, result_sets: Vec<Vec<MergedResult>>) -> Vec<MergedResult> {
        let mut merged = self.threshold_and_sort(result_sets);
        merged.truncate(self.max_results);
        merged
    }

    /// Drops results that look like a higher-ranked result.
    ///
    /// Two results are duplicates when their scores differ by less than the configured delta
    /// and their leading characters match. Input is expected in descending score order; the
    /// first result of each group is kept.
    #[must_use]
    pub fn deduplicate(&self, results: Vec<MergedResult>) -> Vec<MergedResult> {
        let mut kept: Vec<MergedResult> = Vec::with_capacity(results.len());
        for result in results {
            if !kept.iter().any(|existing| self.is_duplicate(existing, &result)) {
                kept.push(result);
            }
        }
        kept
    }

    /// Full retrieval pipeline: fan out, threshold and sort, deduplicate, cap.
    pub async fn retrieve(
        &self,
        collections: &[Arc<VectorStore>],
        query: &[f32],
    ) -> Vec<MergedResult> {
        let result_sets = self
            .query_multiple(collections, query, self.per_collection_limit)
            .await;
        let mut results = self.deduplicate(self.threshold_and_sort(result_sets));
        results.truncate(self.max_results);
        results
    }

    fn threshold_and_sort(&self, result_sets: Vec<Vec<MergedResult>>) -> Vec<MergedResult> {
        let mut merged: Vec<MergedResult> = result_sets
            .into_iter()
            .flatten()
            .filter(|result| result.score >= self.threshold)
            .collect();
        merged.sort_by_key(|result| std::cmp::Reverse(OrderedFloat(result.score)));
        merged
    }

    fn is_duplicate(&self, a: &MergedResult, b: &MergedResult) -> bool {
        (a.score - b.score).abs() < self.duplicate_score_delta
            && a.text
                .chars()
                .take(self.duplicate_prefix_chars)
                .eq(b.text.chars().take(self.duplicate_prefix_chars))
    }
}

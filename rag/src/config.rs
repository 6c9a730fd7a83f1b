//! Configuration for retrieval, context assembly, and generation.

use confidant_core::GenerationParams;
use serde::{Deserialize, Serialize};

/// Requested index strategy for new collections.
///
/// [`IndexStrategy::Auto`] picks the ANN index when it is compiled in and falls back to a
/// linear scan otherwise. See [`IndexStrategy::probe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStrategy {
    /// Use the ANN index if available.
    #[default]
    Auto,
    /// Approximate nearest neighbours over an HNSW graph.
    Hnsw,
    /// Exhaustive cosine scan.
    Linear,
}

/// Configuration for a retrieval engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Minimum similarity score for merged results.
    pub similarity_threshold: f32,
    /// Maximum number of merged results.
    pub max_results: usize,
    /// Number of results requested from each collection.
    pub per_collection_limit: usize,
    /// Character budget of the assembled context body.
    pub max_context_length: usize,
    /// Share of the context budget reserved for personal results.
    pub priority_share: f32,
    /// Smallest passage worth admitting into the context.
    pub min_passage_length: usize,
    /// Score difference below which two results may be duplicates.
    pub duplicate_score_delta: f32,
    /// Number of leading characters compared when deduplicating.
    pub duplicate_prefix_chars: usize,
    /// Documents inserted per batch when importing a knowledge package.
    pub load_batch_size: usize,
    /// Initial capacity of the ANN index, doubled when full.
    pub ann_initial_capacity: usize,
    /// Candidate list size used by ANN queries.
    pub ann_ef_search: usize,
    /// Index strategy for newly created collections.
    pub index_strategy: IndexStrategy,
    /// Sampling temperature passed to the generation provider.
    pub temperature: f32,
    /// Token budget passed to the generation provider.
    pub max_tokens: u32,
    /// Conversation turns rendered into each prompt.
    pub history_turns_in_prompt: usize,
    /// Exchanges kept in conversation history.
    pub max_history_exchanges: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            max_results: 4,
            per_collection_limit: 3,
            max_context_length: 800,
            priority_share: 0.6,
            min_passage_length: 50,
            duplicate_score_delta: 0.05,
            duplicate_prefix_chars: 50,
            load_batch_size: 100,
            ann_initial_capacity: 1000,
            ann_ef_search: 64,
            index_strategy: IndexStrategy::Auto,
            temperature: 0.7,
            max_tokens: 256,
            history_turns_in_prompt: 4,
            max_history_exchanges: 10,
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }

    /// Generation parameters derived from this configuration.
    #[must_use]
    pub const fn generation_params(&self) -> GenerationParams {
        GenerationParams::new(self.temperature, self.max_tokens)
    }
}

/// Builder for [`RagConfig`].
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the minimum similarity threshold for merged results.
    #[must_use]
    pub const fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Sets the maximum number of merged results.
    #[must_use]
    pub const fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    /// Sets the number of results requested from each collection.
    #[must_use]
    pub const fn per_collection_limit(mut self, limit: usize) -> Self {
        self.config.per_collection_limit = limit;
        self
    }

    /// Sets the character budget of the assembled context.
    #[must_use]
    pub const fn max_context_length(mut self, length: usize) -> Self {
        self.config.max_context_length = length;
        self
    }

    /// Sets the documents inserted per import batch.
    #[must_use]
    pub const fn load_batch_size(mut self, size: usize) -> Self {
        self.config.load_batch_size = size;
        self
    }

    /// Sets the initial ANN capacity.
    #[must_use]
    pub const fn ann_initial_capacity(mut self, capacity: usize) -> Self {
        self.config.ann_initial_capacity = capacity;
        self
    }

    /// Sets the ANN query candidate list size.
    #[must_use]
    pub const fn ann_ef_search(mut self, ef: usize) -> Self {
        self.config.ann_ef_search = ef;
        self
    }

    /// Sets the index strategy for new collections.
    #[must_use]
    pub const fn index_strategy(mut self, strategy: IndexStrategy) -> Self {
        self.config.index_strategy = strategy;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Sets the generation token budget.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Sets how many exchanges of history are kept.
    #[must_use]
    pub const fn max_history_exchanges(mut self, exchanges: usize) -> Self {
        self.config.max_history_exchanges = exchanges;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}

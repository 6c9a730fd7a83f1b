//! Error types for the retrieval engine.

use thiserror::Error;

/// Errors that can occur in retrieval, caching, and assistant operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Dimension mismatch between a vector and its collection.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// The collection was used before `initialize`.
    #[error("collection `{collection}` is not initialized")]
    NotInitialized {
        /// Name of the collection.
        collection: String,
    },

    /// No collection with this name is registered.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A collection with this name is already registered.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// Text generation failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The generation provider gave up waiting on the model.
    #[error("the model is still loading, please try again")]
    GenerationTimeout,

    /// A knowledge package is malformed or incompatible.
    #[error("invalid knowledge package: {0}")]
    InvalidPackage(String),

    /// Document metadata failed validation.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Durable store operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

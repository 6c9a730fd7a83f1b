//! Core types for the retrieval engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RagError, Result};

/// Key/value metadata attached to documents.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A primitive metadata value.
///
/// Nested arrays and objects are not representable and fail to deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Free text.
    Text(String),
}

impl MetadataValue {
    /// Returns the text payload, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Metadata keys the engine interprets. They must hold text when present.
const TEXT_KEYS: [&str; 2] = ["source", "category"];

/// Checks metadata at a collection's write boundary.
///
/// # Errors
///
/// Returns [`RagError::InvalidMetadata`] for empty keys, non-finite floats, or a non-text
/// `source`/`category`.
pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    for (key, value) in metadata {
        if key.is_empty() {
            return Err(RagError::InvalidMetadata("empty metadata key".into()));
        }
        if matches!(value, MetadataValue::Float(number) if !number.is_finite()) {
            return Err(RagError::InvalidMetadata(format!(
                "`{key}` is not a finite number"
            )));
        }
        if TEXT_KEYS.contains(&key.as_str()) && value.as_str().is_none() {
            return Err(RagError::InvalidMetadata(format!("`{key}` must be text")));
        }
    }
    Ok(())
}

/// A document stored in a collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique within a collection.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Embedding vector. Its length must equal the collection dimension.
    pub embedding: Vec<f32>,
    /// Arbitrary primitive metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Creates a new document with empty metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Exact-match filter over the `source` and `category` metadata keys.
///
/// An empty filter matches every document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Required `source` value.
    pub source: Option<String>,
    /// Required `category` value.
    pub category: Option<String>,
}

impl MetadataFilter {
    /// Filter on `source` only.
    #[must_use]
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            category: None,
        }
    }

    /// Filter on `category` only.
    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            source: None,
            category: Some(category.into()),
        }
    }

    /// Returns `true` if `metadata` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let field_matches = |key: &str, expected: Option<&String>| {
            expected.is_none_or(|expected| {
                metadata.get(key).and_then(MetadataValue::as_str) == Some(expected.as_str())
            })
        };
        field_matches("source", self.source.as_ref())
            && field_matches("category", self.category.as_ref())
    }
}

/// Which tier a collection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Knowledge shared by every user.
    Shared,
    /// One user's own entries.
    Personal,
}

/// A single search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matching document.
    pub document_id: String,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
    /// Passage text.
    pub text: String,
    /// Document metadata.
    pub metadata: Metadata,
}

/// A search hit annotated with the collection it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    /// Identifier of the matching document.
    pub document_id: String,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
    /// Passage text.
    pub text: String,
    /// Document metadata.
    pub metadata: Metadata,
    /// Name of the source collection.
    pub collection: String,
    /// Tier of the source collection.
    pub kind: CollectionKind,
}

impl MergedResult {
    /// Tags a collection-local result with its origin.
    #[must_use]
    pub fn from_search(
        result: SearchResult,
        collection: impl Into<String>,
        kind: CollectionKind,
    ) -> Self {
        Self {
            document_id: result.document_id,
            score: result.score,
            text: result.text,
            metadata: result.metadata,
            collection: collection.into(),
            kind,
        }
    }

    /// Returns `true` if this result belongs to the personal tier.
    ///
    /// Personal results come from a personal collection, carry an `entry_` id, or are tagged
    /// `source = "personal"`.
    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.kind == CollectionKind::Personal
            || self.document_id.starts_with("entry_")
            || self.metadata.get("source").and_then(MetadataValue::as_str) == Some("personal")
    }
}

/// Size statistics of one collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Live documents.
    pub document_count: usize,
    /// Vectors held by the ANN index. Always 0 for the linear strategy.
    pub indexed_count: usize,
    /// Rough storage footprint in bytes.
    pub estimated_storage_bytes: usize,
}

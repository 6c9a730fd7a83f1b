//! Knowledge package import with progress tracking.
//!
//! A knowledge package is a JSON document with a manifest, a list of documents, and a list of
//! precomputed embeddings aligned with the documents by position:
//!
//! ```json
//! {
//!   "manifest": { "version": "1.0", "name": "sleep", "documentCount": 1, "embeddingDimension": 3 },
//!   "documents": [ { "id": "doc_1", "text": "Sleep and mood are linked.", "metadata": { "category": "sleep" } } ],
//!   "embeddings": [ [0.1, 0.2, 0.3] ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::store::VectorStore;
use crate::types::{Document, Metadata};

/// Package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package format version.
    pub version: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared number of documents.
    pub document_count: usize,
    /// Dimension of every embedding in the package.
    pub embedding_dimension: usize,
    /// Creation timestamp as written by the packaging tool.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Source labels.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// A document entry of a package, without its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDocument {
    /// Document id.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Primitive metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A parsed knowledge package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePackage {
    /// Package manifest.
    pub manifest: PackageManifest,
    /// Documents, aligned with `embeddings`.
    #[serde(default)]
    pub documents: Vec<PackageDocument>,
    /// Embeddings, aligned with `documents`.
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

impl KnowledgePackage {
    /// Parses a package from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidPackage`] for malformed JSON, missing fields, or nested
    /// metadata values.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| RagError::InvalidPackage(e.to_string()))
    }

    /// Reads and parses a package file.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read, otherwise as
    /// [`from_slice`](Self::from_slice).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_slice(&std::fs::read(path)?)
    }

    /// Checks the package against a collection dimension without inserting anything.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if the manifest or any embedding disagrees with
    ///   `dimension`.
    /// - [`RagError::InvalidPackage`] if documents and embeddings are not aligned.
    pub fn validate(&self, dimension: usize) -> Result<()> {
        if self.manifest.embedding_dimension != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: self.manifest.embedding_dimension,
            });
        }
        if self.documents.len() != self.embeddings.len() {
            return Err(RagError::InvalidPackage(format!(
                "{} documents but {} embeddings",
                self.documents.len(),
                self.embeddings.len()
            )));
        }
        if let Some(bad) = self.embeddings.iter().find(|e| e.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if self.manifest.document_count != self.documents.len() {
            warn!(
                package = %self.manifest.name,
                declared = self.manifest.document_count,
                actual = self.documents.len(),
                "manifest document count disagrees with package contents"
            );
        }
        Ok(())
    }

    /// Pairs each document with its embedding.
    #[must_use]
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
            .into_iter()
            .zip(self.embeddings)
            .map(|(doc, embedding)| Document {
                id: doc.id,
                text: doc.text,
                embedding,
                metadata: doc.metadata,
            })
            .collect()
    }
}

/// Progress update during a package import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Documents inserted so far.
    pub loaded: usize,
    /// Documents in the package.
    pub total: usize,
    /// Current stage.
    pub stage: LoadStage,
}

impl LoadProgress {
    /// Creates a new progress update.
    #[must_use]
    pub const fn new(loaded: usize, total: usize, stage: LoadStage) -> Self {
        Self {
            loaded,
            total,
            stage,
        }
    }
}

/// Stages of a package import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Checking dimension and alignment.
    Validating,
    /// Inserting batches.
    Loading,
    /// Import finished.
    Done,
}

/// Imports knowledge packages into a collection in fixed-size batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgeLoader {
    batch_size: usize,
}

impl Default for KnowledgeLoader {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl KnowledgeLoader {
    /// Creates a loader with an explicit batch size (at least 1).
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Creates a loader from configuration.
    #[must_use]
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.load_batch_size)
    }

    /// Validates `package` against `store`, then inserts it batch by batch.
    ///
    /// Nothing is inserted unless validation passes. Returns the number of documents added.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] if the store has no dimension.
    /// - Any validation error of [`KnowledgePackage::validate`].
    /// - Any error of [`VectorStore::add_documents`]; batches already inserted stay.
    pub fn load<F>(
        &self,
        store: &VectorStore,
        package: KnowledgePackage,
        mut on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(LoadProgress),
    {
        let total = package.documents.len();
        on_progress(LoadProgress::new(0, total, LoadStage::Validating));

        let dimension = store.dimension().ok_or_else(|| RagError::NotInitialized {
            collection: store.name().to_string(),
        })?;
        package.validate(dimension)?;

        let name = package.manifest.name.clone();
        let mut documents = package.into_documents().into_iter();
        let mut loaded = 0;
        loop {
            let batch: Vec<Document> = documents.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            loaded += store.add_documents(batch)?;
            debug!(package = %name, loaded, total, "imported batch");
            on_progress(LoadProgress::new(loaded, total, LoadStage::Loading));
        }

        on_progress(LoadProgress::new(loaded, total, LoadStage::Done));
        info!(
            package = %name,
            collection = %store.name(),
            count = loaded,
            "imported knowledge package"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexStrategy;
    use crate::types::CollectionKind;

    fn package_json(dimension: usize, embeddings: &str) -> String {
        format!(
            r#"{{
                "manifest": {{
                    "version": "1.0.0",
                    "name": "mental_health",
                    "description": "Test package",
                    "documentCount": 3,
                    "embeddingDimension": {dimension},
                    "createdAt": "2025-01-01T00:00:00Z",
                    "sources": ["mental_health"]
                }},
                "documents": [
                    {{"id": "doc_1", "text": "Gratitude practice supports wellbeing.", "metadata": {{"category": "gratitude"}}}},
                    {{"id": "doc_2", "text": "Mindfulness helps manage stress.", "metadata": {{"category": "mindfulness"}}}},
                    {{"id": "doc_3", "text": "Sleep and mood are closely linked."}}
                ],
                "embeddings": {embeddings}
            }}"#
        )
    }

    fn parse(json: &str) -> KnowledgePackage {
        KnowledgePackage::from_slice(json.as_bytes()).unwrap()
    }

    fn store(dimension: usize) -> VectorStore {
        let store = VectorStore::new(
            "shared_knowledge",
            CollectionKind::Shared,
            IndexStrategy::Linear,
        );
        store.initialize(dimension);
        store
    }

    #[test]
    fn parses_manifest_and_documents() {
        let package = parse(&package_json(2, "[[1,0],[0,1],[1,1]]"));
        assert_eq!(package.manifest.name, "mental_health");
        assert_eq!(package.manifest.embedding_dimension, 2);
        assert_eq!(package.documents.len(), 3);
        assert_eq!(package.documents[0].metadata["category"].as_str(), Some("gratitude"));
        assert!(package.documents[2].metadata.is_empty());
    }

    #[test]
    fn loads_in_batches_with_progress() {
        let package = parse(&package_json(2, "[[1,0],[0,1],[1,1]]"));
        let store = store(2);
        let mut updates = Vec::new();

        let loaded = KnowledgeLoader::new(2)
            .load(&store, package, |progress| updates.push(progress))
            .unwrap();

        assert_eq!(loaded, 3);
        assert_eq!(store.len(), 3);
        assert_eq!(
            updates,
            vec![
                LoadProgress::new(0, 3, LoadStage::Validating),
                LoadProgress::new(2, 3, LoadStage::Loading),
                LoadProgress::new(3, 3, LoadStage::Loading),
                LoadProgress::new(3, 3, LoadStage::Done),
            ]
        );
    }

    #[test]
    fn wrong_dimension_rejected_before_insert() {
        let package = parse(&package_json(3, "[[1,0,0],[0,1,0],[1,1,0]]"));
        let store = store(2);

        let err = KnowledgeLoader::default().load(&store, package, |_| {}).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(store.is_empty());
    }

    #[test]
    fn misaligned_embeddings_rejected() {
        let package = parse(&package_json(2, "[[1,0],[0,1]]"));
        let store = store(2);

        let err = KnowledgeLoader::default().load(&store, package, |_| {}).unwrap_err();
        assert!(matches!(err, RagError::InvalidPackage(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn nested_metadata_is_invalid_package() {
        let json = r#"{
            "manifest": {"version": "1", "name": "n", "documentCount": 1, "embeddingDimension": 1},
            "documents": [{"id": "a", "text": "t", "metadata": {"tags": {"x": 1}}}],
            "embeddings": [[1.0]]
        }"#;
        assert!(matches!(
            KnowledgePackage::from_slice(json.as_bytes()),
            Err(RagError::InvalidPackage(_))
        ));
    }

    #[test]
    fn uninitialized_store_is_reported() {
        let package = parse(&package_json(2, "[[1,0],[0,1],[1,1]]"));
        let store = VectorStore::new("raw", CollectionKind::Shared, IndexStrategy::Linear);
        assert!(matches!(
            KnowledgeLoader::default().load(&store, package, |_| {}),
            Err(RagError::NotInitialized { .. })
        ));
    }
}

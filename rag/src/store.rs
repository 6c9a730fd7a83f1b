//! A single named collection of embedded documents.

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::debug;

use crate::config::{IndexStrategy, RagConfig};
use crate::error::{RagError, Result};
use crate::index::{AnnIndex, SlotArena, build_index};
use crate::types::{
    CollectionKind, Document, MetadataFilter, SearchResult, StoreStats, validate_metadata,
};

/// Per-document overhead used by [`VectorStore::stats`] for text and metadata.
const DOCUMENT_OVERHEAD_BYTES: usize = 1000;

struct CollectionState {
    dimension: Option<usize>,
    arena: SlotArena,
    index: Box<dyn AnnIndex>,
}

impl CollectionState {
    fn dimension(&self, collection: &str) -> Result<usize> {
        self.dimension.ok_or_else(|| RagError::NotInitialized {
            collection: collection.to_string(),
        })
    }
}

/// One collection: documents, their slot arena, and a nearest-neighbour index.
///
/// The index strategy is resolved once, at construction. All methods take `&self`; a
/// [`parking_lot::RwLock`] lets searches run concurrently while writes, and rebuilds of a stale
/// index, are exclusive.
///
/// # Example
///
/// ```rust
/// use confidant_rag::{CollectionKind, Document, IndexStrategy, VectorStore};
///
/// let store = VectorStore::new("shared_knowledge", CollectionKind::Shared, IndexStrategy::Linear);
/// store.initialize(2);
/// store.add_document(Document::new("g1", "Exercise helps mood", vec![1.0, 0.0]))?;
///
/// let hits = store.search(&[1.0, 0.0], 1, None)?;
/// assert_eq!(hits[0].document_id, "g1");
/// # Ok::<(), confidant_rag::RagError>(())
/// ```
pub struct VectorStore {
    name: String,
    kind: CollectionKind,
    strategy: IndexStrategy,
    config: RagConfig,
    state: RwLock<CollectionState>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VectorStore")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("strategy", &self.strategy)
            .field("dimension", &state.dimension)
            .field("len", &state.arena.len())
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Creates an uninitialized collection with default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CollectionKind, strategy: IndexStrategy) -> Self {
        let config = RagConfig::builder().index_strategy(strategy).build();
        Self::with_config(name, kind, &config)
    }

    /// Creates an uninitialized collection using `config.index_strategy`.
    #[must_use]
    pub fn with_config(name: impl Into<String>, kind: CollectionKind, config: &RagConfig) -> Self {
        let strategy = config.index_strategy.probe();
        Self {
            name: name.into(),
            kind,
            strategy,
            config: config.clone(),
            state: RwLock::new(CollectionState {
                dimension: None,
                arena: SlotArena::new(),
                index: build_index(strategy, config),
            }),
        }
    }

    /// Fixes the embedding dimension and resets the collection to empty.
    pub fn initialize(&self, dimension: usize) {
        let mut state = self.state.write();
        *state = CollectionState {
            dimension: Some(dimension),
            arena: SlotArena::new(),
            index: build_index(self.strategy, &self.config),
        };
        debug!(
            collection = %self.name,
            dimension,
            strategy = ?self.strategy,
            "initialized collection"
        );
    }

    /// Adds a batch of documents.
    ///
    /// Every document is validated before anything is stored, so a failing batch leaves the
    /// collection untouched. Re-adding an existing id replaces that document.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] before [`initialize`](Self::initialize).
    /// - [`RagError::DimensionMismatch`] if any embedding has the wrong length.
    /// - [`RagError::InvalidMetadata`] if any document carries invalid metadata.
    pub fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        let mut state = self.state.write();
        let dimension = state.dimension(&self.name)?;

        for document in &documents {
            if document.embedding.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: document.embedding.len(),
                });
            }
            validate_metadata(&document.metadata)?;
        }

        let count = documents.len();
        let CollectionState { arena, index, .. } = &mut *state;
        for document in documents {
            let embedding = document.embedding.clone();
            let placement = arena.insert(document).ok_or_else(|| {
                RagError::Storage(anyhow::anyhow!(
                    "collection `{}` ran out of slot labels",
                    self.name
                ))
            })?;
            if let Some(old) = placement.replaced {
                index.remove(old);
            }
            index.insert(placement.label, &embedding);
        }

        debug!(collection = %self.name, count, "added documents");
        Ok(count)
    }

    /// Adds a single document.
    ///
    /// # Errors
    ///
    /// Same as [`add_documents`](Self::add_documents).
    pub fn add_document(&self, document: Document) -> Result<()> {
        self.add_documents(vec![document]).map(|_| ())
    }

    /// Returns at most `k` documents most similar to `query`, best first.
    ///
    /// With the ANN strategy the filter is applied after retrieval, so fewer than `k` results may
    /// come back even when more matching documents exist.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] before [`initialize`](Self::initialize).
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        {
            let state = self.state.read();
            let dimension = state.dimension(&self.name)?;
            if query.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }
            if k == 0 || state.arena.is_empty() {
                return Ok(Vec::new());
            }
            if !state.index.is_stale() {
                return Ok(state.index.search(query, k, &state.arena, filter));
            }
        }

        let mut state = self.state.write();
        if state.index.is_stale() {
            debug!(collection = %self.name, "rebuilding stale index before search");
            state.index.rebuild();
        }
        let state = RwLockWriteGuard::downgrade(state);
        Ok(state.index.search(query, k, &state.arena, filter))
    }

    /// Removes the document with `id`. Returns `false` if it was not present.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.state.write();
        let Some((label, _)) = state.arena.remove(id) else {
            return false;
        };
        state.index.remove(label);
        true
    }

    /// Compacts surviving documents into fresh slots and rebuilds the index.
    ///
    /// Starts a new label generation.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] before [`initialize`](Self::initialize).
    pub fn rebuild_index(&self) -> Result<()> {
        let mut state = self.state.write();
        state.dimension(&self.name)?;

        let CollectionState { arena, index, .. } = &mut *state;
        arena.compact();
        index.clear();
        for (label, document) in arena.iter() {
            index.insert(label, &document.embedding);
        }
        index.rebuild();

        debug!(
            collection = %self.name,
            generation = arena.generation(),
            count = arena.len(),
            "rebuilt index"
        );
        Ok(())
    }

    /// Drops every document. The dimension is kept.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.arena.clear();
        state.index.clear();
    }

    /// Returns size statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        let document_count = state.arena.len();
        let dimension = state.dimension.unwrap_or(0);
        StoreStats {
            document_count,
            indexed_count: state.index.indexed_count(),
            estimated_storage_bytes: document_count
                * (dimension * std::mem::size_of::<f32>() + DOCUMENT_OVERHEAD_BYTES),
        }
    }

    /// Returns a copy of the document with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Document> {
        self.state.read().arena.get_by_id(id).cloned()
    }

    /// Returns `true` if a document with `id` is stored.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.state.read().arena.label_of(id).is_some()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().arena.len()
    }

    /// Returns `true` if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().arena.is_empty()
    }

    /// Embedding dimension, once initialized.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().dimension
    }

    /// Current label generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.read().arena.generation()
    }

    /// Resolved index strategy.
    #[must_use]
    pub const fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection tier.
    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Snapshot of every stored document in label order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.state
            .read()
            .arena
            .iter()
            .map(|(_, document)| document.clone())
            .collect()
    }
}

//! Whole-collection snapshots stored as JSON blobs.

use confidant_core::DurableStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::store::VectorStore;
use crate::types::{CollectionKind, Document};

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Durable store key of the snapshot of collection `name`.
#[must_use]
pub fn snapshot_key(name: &str) -> String {
    format!("collections/{name}.json")
}

/// Serialized form of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// Format version.
    pub version: u32,
    /// Collection name.
    pub name: String,
    /// Collection tier.
    pub kind: CollectionKind,
    /// Embedding dimension.
    pub dimension: usize,
    /// Live documents in label order.
    pub documents: Vec<Document>,
}

impl CollectionSnapshot {
    /// Captures the current contents of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] if the store has no dimension.
    pub fn capture(store: &VectorStore) -> Result<Self> {
        let dimension = store.dimension().ok_or_else(|| RagError::NotInitialized {
            collection: store.name().to_string(),
        })?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            name: store.name().to_string(),
            kind: store.kind(),
            dimension,
            documents: store.documents(),
        })
    }

    /// Rebuilds a collection from this snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the documents do not match the recorded dimension.
    pub fn restore(self, config: &RagConfig) -> Result<VectorStore> {
        let store = VectorStore::with_config(self.name, self.kind, config);
        store.initialize(self.dimension);
        store.add_documents(self.documents)?;
        Ok(store)
    }
}

/// Writes a snapshot of `collection` to `store`.
///
/// # Errors
///
/// Returns [`RagError::Storage`] if the write fails, or any error of
/// [`CollectionSnapshot::capture`].
pub async fn save_collection<S: DurableStore>(store: &S, collection: &VectorStore) -> Result<()> {
    let snapshot = CollectionSnapshot::capture(collection)?;
    let bytes = serde_json::to_vec(&snapshot)?;
    store
        .write(&snapshot_key(&snapshot.name), &bytes)
        .await
        .map_err(RagError::Storage)?;
    debug!(
        collection = %snapshot.name,
        count = snapshot.documents.len(),
        "saved collection snapshot"
    );
    Ok(())
}

/// Restores collection `name` from `store`. Returns `Ok(None)` if no snapshot exists.
///
/// # Errors
///
/// - [`RagError::Storage`] if the read fails.
/// - [`RagError::Serialization`] for an unreadable or newer snapshot.
pub async fn restore_collection<S: DurableStore>(
    store: &S,
    name: &str,
    config: &RagConfig,
) -> Result<Option<VectorStore>> {
    let Some(bytes) = store
        .read(&snapshot_key(name))
        .await
        .map_err(RagError::Storage)?
    else {
        return Ok(None);
    };

    let snapshot: CollectionSnapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(RagError::Serialization(format!(
            "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
            snapshot.version
        )));
    }

    let restored = snapshot.restore(config)?;
    info!(collection = name, count = restored.len(), "restored collection");
    Ok(Some(restored))
}

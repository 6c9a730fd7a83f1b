//! Named collections sharing one embedding dimension.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::store::VectorStore;
use crate::types::CollectionKind;

/// Name of the collection every user reads from.
pub const SHARED_COLLECTION: &str = "shared_knowledge";

/// Registry of collections, keyed by name.
///
/// Every registered collection is initialized with the registry's dimension.
#[derive(Debug)]
pub struct CollectionRegistry {
    dimension: usize,
    config: RagConfig,
    collections: RwLock<BTreeMap<String, Arc<VectorStore>>>,
}

impl CollectionRegistry {
    /// Creates an empty registry with default configuration.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self::with_config(dimension, RagConfig::default())
    }

    /// Creates an empty registry whose collections use `config`.
    #[must_use]
    pub fn with_config(dimension: usize, config: RagConfig) -> Self {
        Self {
            dimension,
            config,
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Collection name holding the personal entries of `user_id`.
    #[must_use]
    pub fn personal_collection_name(user_id: &str) -> String {
        format!("user_{user_id}")
    }

    /// Creates and registers an initialized, empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollectionExists`] if the name is taken.
    pub fn create(&self, name: &str, kind: CollectionKind) -> Result<Arc<VectorStore>> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(RagError::CollectionExists(name.to_string()));
        }

        let store = Arc::new(VectorStore::with_config(name, kind, &self.config));
        store.initialize(self.dimension);
        collections.insert(name.to_string(), Arc::clone(&store));
        debug!(collection = name, kind = ?kind, "created collection");
        Ok(store)
    }

    /// Registers an existing collection, replacing any collection with the same name.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] if the store has no dimension yet.
    /// - [`RagError::DimensionMismatch`] if its dimension differs from the registry's.
    pub fn insert(&self, store: VectorStore) -> Result<Arc<VectorStore>> {
        let dimension = store.dimension().ok_or_else(|| RagError::NotInitialized {
            collection: store.name().to_string(),
        })?;
        if dimension != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: dimension,
            });
        }

        let store = Arc::new(store);
        self.collections
            .write()
            .insert(store.name().to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Returns the collection called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<VectorStore>> {
        self.collections.read().get(name).cloned()
    }

    /// Returns the shared collection, if registered.
    #[must_use]
    pub fn shared(&self) -> Option<Arc<VectorStore>> {
        self.get(SHARED_COLLECTION)
    }

    /// Returns the shared collection, creating it when missing.
    pub fn shared_or_create(&self) -> Arc<VectorStore> {
        let mut collections = self.collections.write();
        let store = collections
            .entry(SHARED_COLLECTION.to_string())
            .or_insert_with(|| {
                let store = VectorStore::with_config(
                    SHARED_COLLECTION,
                    CollectionKind::Shared,
                    &self.config,
                );
                store.initialize(self.dimension);
                Arc::new(store)
            });
        Arc::clone(store)
    }

    /// Unregisters and returns the collection called `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<VectorStore>> {
        self.collections.write().remove(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Every registered collection, sorted by name.
    #[must_use]
    pub fn collections(&self) -> Vec<Arc<VectorStore>> {
        self.collections.read().values().cloned().collect()
    }

    /// Collections a query from `user_id` may read: the shared collection and that user's
    /// personal collection, each only when registered. Other users' collections are excluded.
    #[must_use]
    pub fn scope(&self, user_id: Option<&str>) -> Vec<Arc<VectorStore>> {
        let personal = user_id.map(Self::personal_collection_name);
        let collections = self.collections.read();
        std::iter::once(SHARED_COLLECTION)
            .chain(personal.as_deref())
            .filter_map(|name| collections.get(name).cloned())
            .collect()
    }

    /// Dimension shared by all collections.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Configuration applied to new collections.
    #[must_use]
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }
}

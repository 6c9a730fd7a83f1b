//! Durable store backends and collection snapshots.
//!
//! Every backend implements [`DurableStore`]: opaque bytes addressed by slash-separated keys.
//!
//! | Backend | Layout |
//! |---------|--------|
//! | [`FileStore`] | one file per key under a root directory |
//! | [`RedbStore`] | one redb table mapping key to bytes |
//! | [`MemoryStore`] | in-process map, for tests and ephemeral sessions |

mod redb_backend;
mod snapshot;

pub use redb_backend::RedbStore;
pub use snapshot::{
    CollectionSnapshot, SNAPSHOT_VERSION, restore_collection, save_collection, snapshot_key,
};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use confidant_core::DurableStore;
use parking_lot::Mutex;

/// Stores each key as a file below a root directory.
///
/// Keys must be relative paths without `.`/`..` components. Writes go through a temporary file
/// followed by a rename, so readers never observe a partially written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.root.clone();
        for component in key.split('/') {
            let valid = !component.is_empty()
                && component != "."
                && component != ".."
                && !component.contains(['\\', ':', '\0']);
            if !valid {
                anyhow::bail!("invalid storage key `{key}`");
            }
            path.push(component);
        }
        Ok(path)
    }
}

impl DurableStore for FileStore {
    async fn read(&self, key: &str) -> confidant_core::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> confidant_core::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes).with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// Keeps values in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl DurableStore for MemoryStore {
    async fn read(&self, key: &str) -> confidant_core::Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> confidant_core::Result<()> {
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

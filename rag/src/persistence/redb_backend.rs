//! redb-based embedded database persistence.

use redb::{Database, ReadableTable, TableDefinition};
use std::fs;
use std::path::{Path, PathBuf};

use confidant_core::DurableStore;

use crate::error::{RagError, Result};

const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Durable store backed by a single redb database file.
///
/// Keys map one-to-one onto rows of a `blobs` table. Each write is its own transaction.
///
/// # Example
///
/// ```rust,no_run
/// use confidant_rag::persistence::RedbStore;
///
/// let store = RedbStore::open("./confidant.redb")?;
/// # Ok::<(), confidant_rag::RagError>(())
/// ```
pub struct RedbStore {
    path: PathBuf,
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Creates or opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| RagError::Database(e.to_string()))?;

        Ok(Self { path, db })
    }

    /// Database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored key in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Database`] if the table cannot be read.
    pub fn keys(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| RagError::Database(e.to_string()))?;

        let table = match read_txn.open_table(BLOBS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(RagError::Database(e.to_string())),
        };

        let mut keys = Vec::new();
        for result in table
            .iter()
            .map_err(|e| RagError::Database(e.to_string()))?
        {
            let (key, _) = result.map_err(|e| RagError::Database(e.to_string()))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| RagError::Database(e.to_string()))?;

        let table = match read_txn.open_table(BLOBS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(RagError::Database(e.to_string())),
        };

        let value = table
            .get(key)
            .map_err(|e| RagError::Database(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| RagError::Database(e.to_string()))?;

        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| RagError::Database(e.to_string()))?;
            table
                .insert(key, bytes)
                .map_err(|e| RagError::Database(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| RagError::Database(e.to_string()))?;

        Ok(())
    }
}

impl DurableStore for RedbStore {
    async fn read(&self, key: &str) -> confidant_core::Result<Option<Vec<u8>>> {
        Ok(self.read_blob(key)?)
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> confidant_core::Result<()> {
        Ok(self.write_blob(key, bytes)?)
    }
}

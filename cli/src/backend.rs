//! Durable store selection for the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use confidant_core::DurableStore;
use confidant_rag::persistence::{FileStore, RedbStore};

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// One file per key below the data directory.
    #[default]
    File,
    /// A single redb database file in the data directory.
    Redb,
}

impl BackendKind {
    /// Parse backend from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" | "files" | "fs" => Some(Self::File),
            "redb" | "db" => Some(Self::Redb),
            _ => None,
        }
    }

    /// Opens the backend inside `data_dir`.
    pub fn open(self, data_dir: &Path) -> Result<Storage> {
        Ok(match self {
            Self::File => Storage::File(FileStore::new(data_dir)),
            Self::Redb => {
                let path = data_dir.join("confidant.redb");
                let store = RedbStore::open(&path)
                    .with_context(|| format!("opening {}", path.display()))?;
                Storage::Redb(store)
            }
        })
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Redb => write!(f, "redb"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown backend: {s}"))
    }
}

/// An opened storage backend.
#[derive(Debug)]
pub enum Storage {
    /// Files below a root directory.
    File(FileStore),
    /// redb database.
    Redb(RedbStore),
}

impl DurableStore for Storage {
    async fn read(&self, key: &str) -> confidant_core::Result<Option<Vec<u8>>> {
        match self {
            Self::File(store) => store.read(key).await,
            Self::Redb(store) => store.read(key).await,
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> confidant_core::Result<()> {
        match self {
            Self::File(store) => store.write(key, bytes).await,
            Self::Redb(store) => store.write(key, bytes).await,
        }
    }
}

//! Opaque key/value byte storage.
//!
//! Keys are slash-separated relative paths such as `cache/responses_en.json`. Backends decide how
//! to map them onto files, database rows, or host IPC calls.

use core::future::Future;

use std::sync::Arc;

/// Durable byte storage addressed by string keys.
///
/// A missing key is not an error: [`read`](DurableStore::read) resolves to `Ok(None)`.
pub trait DurableStore: Send + Sync {
    /// Reads the bytes stored under `key`.
    fn read(&self, key: &str) -> impl Future<Output = crate::Result<Option<Vec<u8>>>> + Send;

    /// Replaces whatever is stored under `key` with `bytes`.
    fn write(&self, key: &str, bytes: &[u8]) -> impl Future<Output = crate::Result<()>> + Send;
}

impl<T: DurableStore> DurableStore for Arc<T> {
    fn read(&self, key: &str) -> impl Future<Output = crate::Result<Option<Vec<u8>>>> + Send {
        T::read(self, key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> impl Future<Output = crate::Result<()>> + Send {
        T::write(self, key, bytes)
    }
}

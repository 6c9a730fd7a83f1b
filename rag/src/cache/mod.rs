//! Persistent response cache for frequent queries.
//!
//! Responses are keyed by normalized query text, one cache per language. Each language lives in
//! its own context guarded by its own async mutex, so traffic in one language never waits on
//! another. Contexts are loaded lazily (or explicitly with [`ResponseCache::load`]) from the
//! [`DurableStore`] under `cache/responses_{lang}.json`.
//!
//! Persistence is best effort: read and write failures are logged and the cache keeps serving
//! from memory.

mod seed;

pub use seed::{SEED_QUERIES, SUPPORTED_LANGUAGES, SeedCatalog};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_lock::{Mutex, MutexGuardArc};
use confidant_core::DurableStore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Version written to and expected from persisted cache files.
pub const CACHE_VERSION: &str = "1.1.0";

const TOP_QUERIES: usize = 10;

/// Canonical cache key for `query`.
///
/// Lowercases, strips everything except alphanumerics, `_` and whitespace, collapses whitespace
/// runs to one space and trims. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize(query: &str) -> String {
    let stripped: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Durable store key of the cache file for `language`.
#[must_use]
pub fn cache_key(language: &str) -> String {
    format!("cache/responses_{language}.json")
}

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Normalized query.
    pub query: String,
    /// Cached response text.
    pub response: String,
    /// Language code.
    pub language: String,
    /// When the entry was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Number of times the entry was served.
    pub hit_count: u64,
}

impl CacheEntry {
    fn new(query: &str, response: &str, language: &str) -> Self {
        Self {
            query: query.to_string(),
            response: response.to_string(),
            language: language.to_string(),
            created_at: OffsetDateTime::now_utc(),
            hit_count: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    language: String,
    responses: BTreeMap<String, CacheEntry>,
}

/// Lifecycle of one language context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing read yet.
    #[default]
    Unloaded,
    /// A load started but did not finish. The next access loads again.
    Loading,
    /// Entries are in memory.
    Loaded,
}

#[derive(Debug, Default)]
struct LanguageContext {
    state: CacheState,
    responses: BTreeMap<String, CacheEntry>,
}

/// Usage statistics of one language cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cached responses.
    pub total_entries: usize,
    /// Sum of hit counts.
    pub total_hits: u64,
    /// Up to ten most served queries with their hit counts.
    pub top_queries: Vec<(String, u64)>,
}

/// Query/response cache backed by a [`DurableStore`].
pub struct ResponseCache<S> {
    store: S,
    contexts: parking_lot::Mutex<HashMap<String, Arc<Mutex<LanguageContext>>>>,
}

impl<S> std::fmt::Debug for ResponseCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<String> = self.contexts.lock().keys().cloned().collect();
        languages.sort();
        f.debug_struct("ResponseCache")
            .field("languages", &languages)
            .finish_non_exhaustive()
    }
}

impl<S: DurableStore> ResponseCache<S> {
    /// Creates a cache with no language loaded.
    pub fn new(store: S) -> Self {
        Self {
            store,
            contexts: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `query` normalizes to a seeded query.
    #[must_use]
    pub fn is_common(&self, query: &str) -> bool {
        SeedCatalog::contains(&normalize(query))
    }

    /// Loads the cache for `language`, seeding it when empty. No-op if already loaded.
    pub async fn load(&self, language: &str) {
        drop(self.loaded(language).await);
    }

    /// Drops the in-memory entries for `language`. Persisted data is kept.
    pub async fn unload(&self, language: &str) {
        let context = self.context(language);
        let mut context = context.lock().await;
        context.responses.clear();
        context.state = CacheState::Unloaded;
        debug!(language, "unloaded response cache");
    }

    /// Current lifecycle state of `language`.
    pub async fn state(&self, language: &str) -> CacheState {
        let context = self.context(language);
        let guard = context.lock().await;
        guard.state
    }

    /// Returns the cached response for `query` and counts the hit.
    pub async fn get(&self, query: &str, language: &str) -> Option<String> {
        let key = normalize(query);
        let mut context = self.loaded(language).await;
        let entry = context.responses.get_mut(&key)?;
        entry.hit_count += 1;
        let response = entry.response.clone();
        self.persist(language, &context).await;
        Some(response)
    }

    /// Stores `response` for `query`, replacing any previous entry.
    pub async fn put(&self, query: &str, response: &str, language: &str) {
        let key = normalize(query);
        let mut context = self.loaded(language).await;
        context
            .responses
            .insert(key.clone(), CacheEntry::new(&key, response, language));
        self.persist(language, &context).await;
    }

    /// Removes the entry for `query`. Returns `true` if one was cached.
    pub async fn remove(&self, query: &str, language: &str) -> bool {
        let key = normalize(query);
        let mut context = self.loaded(language).await;
        if context.responses.remove(&key).is_none() {
            return false;
        }
        self.persist(language, &context).await;
        true
    }

    /// Seeds the cache of `language` with its built-in answers if it holds no entries.
    ///
    /// A non-empty cache is left untouched, so stored responses and hit counts survive. Returns
    /// `true` if the seed was written.
    pub async fn prepopulate(&self, language: &str) -> bool {
        let mut context = self.loaded(language).await;
        if !context.responses.is_empty() {
            return false;
        }
        Self::seed(&mut context, language);
        self.persist(language, &context).await;
        true
    }

    /// Usage statistics of `language`.
    pub async fn stats(&self, language: &str) -> CacheStats {
        let context = self.loaded(language).await;
        let mut entries: Vec<&CacheEntry> = context.responses.values().collect();
        entries.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));

        CacheStats {
            total_entries: entries.len(),
            total_hits: entries.iter().map(|entry| entry.hit_count).sum(),
            top_queries: entries
                .iter()
                .take(TOP_QUERIES)
                .map(|entry| (entry.query.clone(), entry.hit_count))
                .collect(),
        }
    }

    /// Empties the cache for `language` and seeds it again.
    pub async fn clear(&self, language: &str) {
        let context = self.context(language);
        let mut context = context.lock().await;
        context.responses.clear();
        Self::seed(&mut context, language);
        context.state = CacheState::Loaded;
        self.persist(language, &context).await;
        info!(language, "cleared response cache");
    }

    /// Snapshot of every entry of `language`.
    pub async fn entries(&self, language: &str) -> Vec<CacheEntry> {
        self.loaded(language).await.responses.values().cloned().collect()
    }

    /// Returns the durable store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn context(&self, language: &str) -> Arc<Mutex<LanguageContext>> {
        Arc::clone(self.contexts.lock().entry(language.to_string()).or_default())
    }

    async fn loaded(&self, language: &str) -> LoadedContext {
        let context = self.context(language);
        let mut guard = context.lock_arc().await;
        if guard.state != CacheState::Loaded {
            guard.state = CacheState::Loading;
            guard.responses = self.read(language).await;
            if guard.responses.is_empty() {
                Self::seed(&mut guard, language);
                self.persist(language, &guard).await;
            }
            guard.state = CacheState::Loaded;
            debug!(language, entries = guard.responses.len(), "loaded response cache");
        }
        guard
    }

    async fn read(&self, language: &str) -> BTreeMap<String, CacheEntry> {
        let bytes = match self.store.read(&cache_key(language)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return BTreeMap::new(),
            Err(error) => {
                warn!(language, %error, "failed to read response cache");
                return BTreeMap::new();
            }
        };

        match serde_json::from_slice::<CacheFile>(&bytes) {
            Ok(file) if file.version == CACHE_VERSION && file.language == language => {
                file.responses
            }
            Ok(file) => {
                info!(
                    language,
                    found_version = %file.version,
                    found_language = %file.language,
                    "discarding incompatible response cache"
                );
                BTreeMap::new()
            }
            Err(error) => {
                warn!(language, %error, "failed to parse response cache");
                BTreeMap::new()
            }
        }
    }

    async fn persist(&self, language: &str, context: &LanguageContext) {
        let file = CacheFile {
            version: CACHE_VERSION.to_string(),
            language: language.to_string(),
            responses: context.responses.clone(),
        };
        let bytes = match serde_json::to_vec_pretty(&file) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(language, %error, "failed to serialize response cache");
                return;
            }
        };
        if let Err(error) = self.store.write(&cache_key(language), &bytes).await {
            warn!(language, %error, "failed to write response cache");
        }
    }

    fn seed(context: &mut LanguageContext, language: &str) {
        let catalog = SeedCatalog::for_language(language);
        for (query, response) in catalog.entries() {
            context
                .responses
                .insert(query.to_string(), CacheEntry::new(query, response, language));
        }
    }
}

type LoadedContext = MutexGuardArc<LanguageContext>;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryBlobs {
        blobs: SyncMutex<HashMap<String, Vec<u8>>>,
        writes: AtomicUsize,
        fail: bool,
    }

    impl DurableStore for MemoryBlobs {
        async fn read(&self, key: &str) -> confidant_core::Result<Option<Vec<u8>>> {
            if self.fail {
                anyhow::bail!("disk unavailable");
            }
            Ok(self.blobs.lock().get(key).cloned())
        }

        async fn write(&self, key: &str, bytes: &[u8]) -> confidant_core::Result<()> {
            if self.fail {
                anyhow::bail!("disk unavailable");
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.blobs.lock().insert(key.to_string(), bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for query in [
            "  What   CAN you do?? ",
            "Hello, World!",
            "¿Qué tal?",
            "İstanbul trip_plan\t\n ok",
            "",
            "...",
        ] {
            let once = normalize(query);
            assert_eq!(normalize(&once), once, "{query:?}");
        }
        assert_eq!(normalize("  What   CAN you do?? "), "what can you do");
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("a , b"), "a b");
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.put("How much water?", "About 2 litres a day.", "en").await;

        assert_eq!(
            cache.get("how much WATER", "en").await.as_deref(),
            Some("About 2 litres a day.")
        );
        assert!(cache.get("never asked", "en").await.is_none());
    }

    #[tokio::test]
    async fn fresh_cache_is_seeded_and_persisted() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.load("en").await;

        assert_eq!(cache.state("en").await, CacheState::Loaded);
        assert_eq!(cache.entries("en").await.len(), SEED_QUERIES.len());
        assert!(cache.get("Hi!", "en").await.is_some());
        assert!(cache.store().blobs.lock().contains_key("cache/responses_en.json"));
    }

    #[tokio::test]
    async fn hits_are_counted_in_stats() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.get("help", "en").await;
        cache.get("help", "en").await;
        cache.get("hey", "en").await;

        let stats = cache.stats("en").await;
        assert_eq!(stats.total_entries, SEED_QUERIES.len());
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.top_queries[0], ("help".to_string(), 2));
        assert_eq!(stats.top_queries[1], ("hey".to_string(), 1));
    }

    #[tokio::test]
    async fn outdated_version_is_discarded() {
        let store = MemoryBlobs::default();
        let stale = serde_json::json!({
            "version": "1.0.0",
            "language": "en",
            "responses": {
                "sleep tips": {
                    "query": "sleep tips",
                    "response": "old answer",
                    "language": "en",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "hitCount": 9
                }
            }
        });
        store
            .blobs
            .lock()
            .insert(cache_key("en"), serde_json::to_vec(&stale).unwrap());

        let cache = ResponseCache::new(store);
        assert!(cache.get("sleep tips", "en").await.is_none());
        assert_eq!(cache.entries("en").await.len(), SEED_QUERIES.len());
    }

    #[tokio::test]
    async fn persisted_entries_survive_reload() {
        let store = Arc::new(MemoryBlobs::default());
        let cache = ResponseCache::new(Arc::clone(&store));
        cache.put("sleep tips", "Keep a regular bedtime.", "en").await;
        cache.unload("en").await;
        assert_eq!(cache.state("en").await, CacheState::Unloaded);

        let reopened = ResponseCache::new(store);
        assert_eq!(
            reopened.get("Sleep tips!", "en").await.as_deref(),
            Some("Keep a regular bedtime.")
        );
    }

    #[tokio::test]
    async fn languages_are_independent() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.put("sleep tips", "Keep a regular bedtime.", "en").await;

        assert!(cache.get("sleep tips", "fr").await.is_none());
        let french = cache.get("hello", "fr").await.unwrap();
        assert!(french.starts_with("Bonjour"));

        cache.clear("fr").await;
        assert!(cache.get("sleep tips", "en").await.is_some());
    }

    #[tokio::test]
    async fn clear_reseeds() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.put("sleep tips", "Keep a regular bedtime.", "en").await;
        cache.get("hi", "en").await;
        cache.clear("en").await;

        let stats = cache.stats("en").await;
        assert_eq!(stats.total_entries, SEED_QUERIES.len());
        assert_eq!(stats.total_hits, 0);
    }

    #[tokio::test]
    async fn storage_failures_keep_cache_in_memory() {
        let cache = ResponseCache::new(MemoryBlobs {
            fail: true,
            ..MemoryBlobs::default()
        });
        cache.put("sleep tips", "Keep a regular bedtime.", "en").await;
        assert_eq!(
            cache.get("sleep tips", "en").await.as_deref(),
            Some("Keep a regular bedtime.")
        );
    }

    #[tokio::test]
    async fn prepopulate_keeps_existing_entries() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.put("hello", "Hi there, how are you feeling?", "en").await;
        cache.get("hello", "en").await;
        cache.get("help", "en").await;
        let writes = cache.store().writes.load(Ordering::SeqCst);

        assert!(!cache.prepopulate("en").await);
        assert_eq!(cache.store().writes.load(Ordering::SeqCst), writes);

        let entries = cache.entries("en").await;
        let hello = entries.iter().find(|entry| entry.query == "hello").unwrap();
        assert_eq!(hello.response, "Hi there, how are you feeling?");
        assert_eq!(hello.hit_count, 1);
        assert_eq!(cache.stats("en").await.total_hits, 2);
    }

    #[tokio::test]
    async fn prepopulate_fills_an_emptied_cache() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        for query in SEED_QUERIES {
            assert!(cache.remove(query, "en").await);
        }
        assert!(cache.entries("en").await.is_empty());

        assert!(cache.prepopulate("en").await);
        assert_eq!(cache.entries("en").await.len(), SEED_QUERIES.len());
    }

    #[tokio::test]
    async fn remove_forgets_one_entry() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        cache.put("sleep tips", "Keep a regular bedtime.", "en").await;

        assert!(cache.remove("Sleep tips?", "en").await);
        assert!(!cache.remove("sleep tips", "en").await);
        assert!(cache.get("sleep tips", "en").await.is_none());
        assert_eq!(cache.entries("en").await.len(), SEED_QUERIES.len());
    }

    #[test]
    fn common_queries() {
        let cache = ResponseCache::new(MemoryBlobs::default());
        assert!(cache.is_common("What can you do?"));
        assert!(cache.is_common("  HELLO "));
        assert!(!cache.is_common("what helps with headaches"));
    }
}

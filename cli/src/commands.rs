//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use confidant_core::DurableStore;
use confidant_rag::persistence::{restore_collection, save_collection};
use confidant_rag::{
    CollectionKind, KnowledgeLoader, KnowledgePackage, LoadStage, MetadataFilter, RagConfig,
    RagError, ResponseCache, VectorStore,
};
use tracing::debug;

use crate::backend::Storage;

/// Key of the list of collections imported through the CLI.
const CATALOG_KEY: &str = "collections/catalog.json";

/// Storage and configuration shared by every subcommand.
#[derive(Debug)]
pub struct Session {
    storage: Storage,
    config: RagConfig,
}

impl Session {
    pub const fn new(storage: Storage, config: RagConfig) -> Self {
        Self { storage, config }
    }

    /// Imports the package at `path` into `collection`, creating it on first use.
    pub async fn import(self, path: &Path, collection: &str, kind: CollectionKind) -> Result<()> {
        let package = KnowledgePackage::from_path(path)
            .with_context(|| format!("reading package {}", path.display()))?;
        let store = match restore_collection(&self.storage, collection, &self.config).await? {
            Some(store) => store,
            None => {
                let store = VectorStore::with_config(collection, kind, &self.config);
                store.initialize(package.manifest.embedding_dimension);
                store
            }
        };

        let package_name = package.manifest.name.clone();
        let imported = KnowledgeLoader::from_config(&self.config).load(&store, package, |progress| {
            if progress.stage == LoadStage::Loading {
                eprint!("\rimported {}/{}", progress.loaded, progress.total);
            }
        })?;
        eprintln!();

        save_collection(&self.storage, &store).await?;
        self.register(collection).await?;
        println!(
            "Imported {imported} documents from `{package_name}` into {collection} ({} total)",
            store.len()
        );
        Ok(())
    }

    /// Prints the size of every imported collection.
    pub async fn stats(self) -> Result<()> {
        let names = self.catalog().await?;
        if names.is_empty() {
            println!("No collections imported yet.");
            return Ok(());
        }

        println!(
            "{:<24} {:<9} {:>9} {:>9} {:>6} {:>12}",
            "collection", "kind", "documents", "indexed", "dim", "bytes"
        );
        for name in names {
            let Some(store) = restore_collection(&self.storage, &name, &self.config).await? else {
                debug!(collection = %name, "catalog entry without snapshot");
                continue;
            };
            let stats = store.stats();
            println!(
                "{:<24} {:<9} {:>9} {:>9} {:>6} {:>12}",
                name,
                format!("{:?}", store.kind()).to_lowercase(),
                stats.document_count,
                stats.indexed_count,
                store.dimension().unwrap_or_default(),
                stats.estimated_storage_bytes
            );
        }
        Ok(())
    }

    /// Prints the `k` nearest neighbours of a stored document.
    pub async fn search_like(
        self,
        collection: &str,
        document_id: &str,
        k: usize,
        filter: MetadataFilter,
    ) -> Result<()> {
        let Some(store) = restore_collection(&self.storage, collection, &self.config).await? else {
            return Err(RagError::CollectionNotFound(collection.to_string()).into());
        };
        let Some(document) = store.get(document_id) else {
            bail!("document `{document_id}` not found in {collection}");
        };

        let filter = (filter != MetadataFilter::default()).then_some(filter);
        let hits = store.search(&document.embedding, k + 1, filter.as_ref())?;
        for hit in hits.into_iter().filter(|hit| hit.document_id != document_id).take(k) {
            println!("{:.3}  {:<20} {}", hit.score, hit.document_id, preview(&hit.text, 80));
        }
        Ok(())
    }

    /// Cache front end for the `cache` subcommand.
    pub fn into_cache(self) -> ResponseCache<Storage> {
        ResponseCache::new(self.storage)
    }

    async fn catalog(&self) -> Result<Vec<String>> {
        match self.storage.read(CATALOG_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes).context("parsing collection catalog"),
            None => Ok(Vec::new()),
        }
    }

    async fn register(&self, collection: &str) -> Result<()> {
        let mut names = self.catalog().await?;
        if names.iter().any(|name| name == collection) {
            return Ok(());
        }
        names.push(collection.to_string());
        names.sort();
        self.storage
            .write(CATALOG_KEY, &serde_json::to_vec(&names)?)
            .await?;
        Ok(())
    }
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut: String = flat.chars().take(limit).collect();
    format!("{cut}...")
}

//! Operator CLI for the Confidant retrieval engine.
//!
//! Imports knowledge packages, inspects collections and manages the response cache stored in a
//! data directory.
//!
//! # Usage
//!
//! ```bash
//! # Import a package into the shared collection
//! cargo run -p confidant-cli -- import packages/mental_health.json
//!
//! # Import journal entries into a personal collection, using the redb backend
//! cargo run -p confidant-cli -- --backend redb import entries.json --collection user_42 --personal
//!
//! # Collection sizes
//! cargo run -p confidant-cli -- stats
//!
//! # Documents similar to a stored one
//! cargo run -p confidant-cli -- search --like doc_12 --category sleep
//!
//! # Response cache
//! cargo run -p confidant-cli -- --language es cache stats
//! cargo run -p confidant-cli -- cache put "what is sleep hygiene" "Habits that help you sleep well."
//! ```

mod backend;
mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confidant_rag::{
    CollectionKind, CollectionRegistry, MetadataFilter, RagConfig, SHARED_COLLECTION,
};
use tracing_subscriber::EnvFilter;

use crate::backend::BackendKind;
use crate::commands::Session;

/// Operator CLI for the Confidant retrieval engine.
#[derive(Parser, Debug)]
#[command(name = "confidant", version, about)]
struct Args {
    /// Data directory. Defaults to the platform data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend (file, redb).
    #[arg(long, global = true, default_value_t = BackendKind::File)]
    backend: BackendKind,

    /// Path to a JSON configuration file. Missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Language of the response cache.
    #[arg(long, global = true, default_value = "en")]
    language: String,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a knowledge package.
    Import {
        /// Package file (JSON).
        package: PathBuf,

        /// Target collection.
        #[arg(long, default_value = SHARED_COLLECTION)]
        collection: String,

        /// Create the collection as a personal one.
        #[arg(long)]
        personal: bool,

        /// Import into the personal collection of this user (overrides `--collection`).
        #[arg(long)]
        user: Option<String>,
    },
    /// Show imported collections and their sizes.
    Stats,
    /// Find documents similar to a stored document.
    Search {
        /// Id of the document to compare against.
        #[arg(long)]
        like: String,

        /// Collection to search.
        #[arg(long, default_value = SHARED_COLLECTION)]
        collection: String,

        /// Number of results.
        #[arg(short, long, default_value_t = 4)]
        k: usize,

        /// Only documents with this `source`.
        #[arg(long)]
        source: Option<String>,

        /// Only documents with this `category`.
        #[arg(long)]
        category: Option<String>,
    },
    /// Inspect or modify the response cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the cached response for a query.
    Get {
        /// Query text.
        query: String,
    },
    /// Store a response for a query.
    Put {
        /// Query text.
        query: String,
        /// Response text.
        response: String,
    },
    /// Remove every entry and restore the built-in answers.
    Clear,
    /// Entry count, total hits and the most served queries.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("no platform data directory, pass --data-dir")?
            .join("confidant"),
    };
    let config = load_config(args.config.as_deref())?;
    let storage = args.backend.open(&data_dir)?;
    let session = Session::new(storage, config);

    match args.command {
        Command::Import {
            package,
            collection,
            personal,
            user,
        } => {
            let (collection, kind) = match user {
                Some(user) => (
                    CollectionRegistry::personal_collection_name(&user),
                    CollectionKind::Personal,
                ),
                None if personal => (collection, CollectionKind::Personal),
                None => (collection, CollectionKind::Shared),
            };
            session.import(&package, &collection, kind).await
        }
        Command::Stats => session.stats().await,
        Command::Search {
            like,
            collection,
            k,
            source,
            category,
        } => {
            let filter = MetadataFilter { source, category };
            session.search_like(&collection, &like, k, filter).await
        }
        Command::Cache { action } => {
            let cache = session.into_cache();
            let language = args.language.as_str();
            match action {
                CacheAction::Get { query } => match cache.get(&query, language).await {
                    Some(response) => println!("{response}"),
                    None => println!("(not cached)"),
                },
                CacheAction::Put { query, response } => {
                    cache.put(&query, &response, language).await;
                }
                CacheAction::Clear => cache.clear(language).await,
                CacheAction::Stats => {
                    let stats = cache.stats(language).await;
                    println!("entries: {}", stats.total_entries);
                    println!("hits:    {}", stats.total_hits);
                    for (query, hits) in stats.top_queries {
                        println!("{hits:>6}  {query}");
                    }
                }
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let Some(path) = path else {
        return Ok(RagConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

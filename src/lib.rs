//! # confidant
//!
//! Façade crate for the Confidant retrieval engine. It re-exports the provider traits from
//! [`confidant_core`] and, with the default `rag` feature, the retrieval engine from
//! [`confidant_rag`].
//!
//! ## What's inside?
//!
//! - [`EmbeddingProvider`], [`GenerationProvider`] and [`DurableStore`]: the narrow interfaces
//!   the engine consumes. Bring your own model runtime and storage.
//! - `rag::VectorStore` with an HNSW index and a linear-scan fallback.
//! - `rag::RetrievalMerger` + `rag::ContextAssembler` to turn several collections into one
//!   bounded prompt context.
//! - `rag::ResponseCache` for canned and frequently asked questions.
//! - `rag::Assistant`, which wires all of the above into a single query pipeline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use confidant::rag::{CollectionKind, CollectionRegistry, Document};
//!
//! # fn main() -> confidant::rag::Result<()> {
//! let registry = CollectionRegistry::new(3);
//! let shared = registry.create("shared_knowledge", CollectionKind::Shared)?;
//! shared.add_document(Document::new("g1", "Exercise helps mood", vec![1.0, 0.0, 0.0]))?;
//! let hits = shared.search(&[1.0, 0.0, 0.0], 1, None)?;
//! assert_eq!(hits[0].document_id, "g1");
//! # Ok(())
//! # }
//! ```

pub use confidant_core::*;

/// Retrieval, context assembly and response caching.
#[cfg(feature = "rag")]
pub use confidant_rag as rag;

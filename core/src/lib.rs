//! # confidant-core
//!
//! Narrow provider traits consumed by the Confidant retrieval engine.
//!
//! The engine never owns a model runtime or a storage transport. Everything it needs from the
//! outside world goes through three traits:
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────┐    ┌──────────────────────┐
//! │  confidant-rag  │───▶│   confidant-core     │◀───│   Your runtime       │
//! │                 │    │                      │    │                      │
//! │ - VectorStore   │    │ - EmbeddingProvider  │    │ - sentence encoders  │
//! │ - Assistant     │    │ - GenerationProvider │    │ - llama.cpp, ONNX    │
//! │ - ResponseCache │    │ - DurableStore       │    │ - files, IPC, redb   │
//! └─────────────────┘    └──────────────────────┘    └──────────────────────┘
//! ```
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Embeddings** | [`EmbeddingProvider`] | Text to fixed-dimension vectors |
//! | **Generation** | [`GenerationProvider`] | Prompt to text, batch or streaming |
//! | **Storage** | [`DurableStore`] | Opaque byte blobs addressed by key |

/// Conversation turns consumed when composing prompts.
pub mod conversation;
/// Text embeddings.
pub mod embedding;
/// Text generation, batch and streaming.
pub mod generation;
/// Durable key/value byte storage.
pub mod storage;

#[doc(inline)]
pub use conversation::{ConversationTurn, Role};
#[doc(inline)]
pub use embedding::{Embedding, EmbeddingProvider};
#[doc(inline)]
pub use generation::{
    GenerationParams, GenerationProvider, GenerationTimeout, StreamEvent, StreamId,
};
#[doc(inline)]
pub use storage::DurableStore;

/// Result type used by provider implementations.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;

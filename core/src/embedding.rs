//! # Embedding Module
//!
//! Embeddings are dense vector representations of text. Similar passages produce vectors that
//! point in similar directions, which is what the retrieval engine relies on when it ranks
//! documents by cosine similarity.
//!
//! The engine treats the embedding model as an external collaborator. Implement
//! [`EmbeddingProvider`] for whatever runtime you ship (a bundled sentence encoder, an ONNX
//! session, a sidecar process) and hand it to the assistant.
//!
//! ```rust
//! use confidant_core::EmbeddingProvider;
//!
//! async fn example<T: EmbeddingProvider>(model: &T) -> confidant_core::Result<()> {
//!     let embedding = model.embed("How do I sleep better?").await?;
//!     assert_eq!(embedding.len(), model.dim());
//!     Ok(())
//! }
//! ```

use core::future::Future;

/// A type alias for an embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// # Implementation Requirements
///
/// - [`embed`](EmbeddingProvider::embed) must return vectors with length equal to
///   [`dim`](EmbeddingProvider::dim). Collections reject vectors of any other length.
/// - Output must be deterministic for a fixed model version, otherwise cached package
///   embeddings and live query embeddings drift apart.
///
/// # Example
///
/// ```rust
/// use confidant_core::EmbeddingProvider;
///
/// struct MiniLm;
///
/// impl EmbeddingProvider for MiniLm {
///     fn dim(&self) -> usize {
///         384
///     }
///
///     async fn embed(&self, _text: &str) -> confidant_core::Result<Vec<f32>> {
///         // A real implementation would run the encoder here.
///         Ok(vec![0.0; self.dim()])
///     }
/// }
/// ```
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Converts text to an embedding vector of length [`dim`](EmbeddingProvider::dim).
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;

    /// Converts several texts at once.
    ///
    /// The default implementation embeds sequentially. Providers with a native batch API should
    /// override it.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        async move {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(self.embed(text).await?);
            }
            Ok(embeddings)
        }
    }
}

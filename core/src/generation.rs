//! # Text generation
//!
//! The retrieval engine composes a prompt and hands it to a [`GenerationProvider`]. Providers
//! come in two flavours and usually implement both:
//!
//! - **Batch**: [`GenerationProvider::generate`] resolves to the complete text.
//! - **Streaming**: [`GenerationProvider::generate_stream`] yields [`StreamEvent`]s tagged with a
//!   caller-supplied [`StreamId`], ending with exactly one [`StreamEvent::Done`] or
//!   [`StreamEvent::Error`].
//!
//! Timeouts are owned by the provider (or the caller around it). A provider that gives up
//! waiting should fail with [`GenerationTimeout`] so callers can tell "still loading" apart from
//! real failures.

use core::fmt;
use core::future::Future;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded to the generation runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 256,
        }
    }
}

impl GenerationParams {
    /// Creates parameters with the given temperature and token budget.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Identifier correlating streamed chunks with the request that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Wraps a caller-chosen identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events emitted by a streaming generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text. Concatenate chunks in order to obtain the response.
    Chunk {
        /// Stream this chunk belongs to.
        stream_id: StreamId,
        /// Text fragment.
        text: String,
    },
    /// Terminal event: generation finished successfully.
    Done {
        /// Stream that completed.
        stream_id: StreamId,
    },
    /// Terminal event: generation failed.
    Error {
        /// Stream that failed.
        stream_id: StreamId,
        /// Human-readable failure description.
        message: String,
        /// `true` if the provider gave up waiting on the model.
        timed_out: bool,
    },
}

impl StreamEvent {
    /// Returns the stream this event belongs to.
    #[must_use]
    pub const fn stream_id(&self) -> &StreamId {
        match self {
            Self::Chunk { stream_id, .. }
            | Self::Done { stream_id }
            | Self::Error { stream_id, .. } => stream_id,
        }
    }

    /// Returns `true` for [`StreamEvent::Done`] and [`StreamEvent::Error`].
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Terminal failure event.
    #[must_use]
    pub fn failure(stream_id: StreamId, message: impl Into<String>) -> Self {
        Self::Error {
            stream_id,
            message: message.into(),
            timed_out: false,
        }
    }

    /// Terminal event for a stream that timed out, the streaming form of [`GenerationTimeout`].
    #[must_use]
    pub fn timeout(stream_id: StreamId) -> Self {
        Self::Error {
            stream_id,
            message: GenerationTimeout.to_string(),
            timed_out: true,
        }
    }

    /// Returns `true` for an [`StreamEvent::Error`] caused by a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Error { timed_out: true, .. })
    }
}

/// Error returned by providers that gave up waiting on the model.
///
/// Return it (wrapped in [`anyhow::Error`]) from [`GenerationProvider::generate`]; callers
/// detect it with [`anyhow::Error::downcast_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("generation timed out")]
pub struct GenerationTimeout;

/// Turns prompts into text.
///
/// # Example
///
/// ```rust
/// use confidant_core::{GenerationParams, GenerationProvider, StreamEvent, StreamId};
/// use futures::stream;
///
/// struct Echo;
///
/// impl GenerationProvider for Echo {
///     async fn generate(
///         &self,
///         prompt: &str,
///         _params: &GenerationParams,
///     ) -> confidant_core::Result {
///         Ok(prompt.to_string())
///     }
///
///     fn generate_stream(
///         &self,
///         prompt: &str,
///         _params: &GenerationParams,
///         stream_id: StreamId,
///     ) -> impl futures_core::Stream<Item = StreamEvent> + Send + 'static {
///         stream::iter([
///             StreamEvent::Chunk { stream_id: stream_id.clone(), text: prompt.to_string() },
///             StreamEvent::Done { stream_id },
///         ])
///     }
/// }
/// ```
pub trait GenerationProvider: Send + Sync {
    /// Generates the complete response for `prompt`.
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = crate::Result> + Send;

    /// Streams the response for `prompt` as [`StreamEvent`]s tagged with `stream_id`.
    ///
    /// The stream must end with exactly one terminal event.
    fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
        stream_id: StreamId,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::stream;

    struct WordStreamer;

    impl GenerationProvider for WordStreamer {
        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> crate::Result {
            if prompt.is_empty() {
                return Err(GenerationTimeout.into());
            }
            Ok(prompt.to_uppercase())
        }

        fn generate_stream(
            &self,
            prompt: &str,
            _params: &GenerationParams,
            stream_id: StreamId,
        ) -> impl Stream<Item = StreamEvent> + Send + 'static {
            let mut events: Vec<StreamEvent> = prompt
                .split_inclusive(' ')
                .map(|word| StreamEvent::Chunk {
                    stream_id: stream_id.clone(),
                    text: word.to_string(),
                })
                .collect();
            events.push(StreamEvent::Done { stream_id });
            stream::iter(events)
        }
    }

    #[tokio::test]
    async fn timeout_is_detectable_by_downcast() {
        let err = WordStreamer
            .generate("", &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<GenerationTimeout>().is_some());
    }

    #[tokio::test]
    async fn stream_chunks_reassemble_and_terminate_once() {
        let id = StreamId::new("req-7");
        let events: Vec<StreamEvent> = WordStreamer
            .generate_stream("sleep helps recovery", &GenerationParams::default(), id.clone())
            .collect()
            .await;

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Chunk { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "sleep helps recovery");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.iter().all(|e| e.stream_id() == &id));
    }

    #[test]
    fn timeout_events_are_distinguishable() {
        let id = StreamId::new("req-8");
        let timeout = StreamEvent::timeout(id.clone());
        let failure = StreamEvent::failure(id, "out of memory");

        assert!(timeout.is_terminal() && timeout.is_timeout());
        assert!(failure.is_terminal() && !failure.is_timeout());
        assert!(matches!(
            timeout,
            StreamEvent::Error { ref message, .. } if message == "generation timed out"
        ));
    }

    #[test]
    fn default_params_match_assistant_defaults() {
        let params = GenerationParams::default();
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 256);
    }
}

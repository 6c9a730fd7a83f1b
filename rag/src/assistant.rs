//! Query answering: cache, retrieval, context assembly and generation.

use std::sync::Arc;

use confidant_core::{
    ConversationTurn, DurableStore, EmbeddingProvider, GenerationProvider, GenerationTimeout,
    StreamEvent, StreamId,
};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::error::{RagError, Result};
use crate::merge::RetrievalMerger;
use crate::prompt::{clean_response, compose_prompt, normalize_error_message};
use crate::registry::CollectionRegistry;
use crate::types::MergedResult;

/// Answer produced by [`Assistant::respond`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantResponse {
    /// Cleaned response text.
    pub text: String,
    /// Retrieved passages the context was assembled from.
    pub sources: Vec<MergedResult>,
    /// `true` if any passage was placed into the prompt.
    pub used_retrieval: bool,
    /// `true` if the response came from the response cache.
    pub cached: bool,
}

/// Conversational front end over a [`CollectionRegistry`].
///
/// Each query searches the shared collection and, once a user is set with
/// [`with_user`](Self::with_user), that user's personal collection. Personal collections of other
/// users are never read. Conversation history is kept in memory and bounded by
/// [`RagConfig::max_history_exchanges`].
pub struct Assistant<E, G, S> {
    embedder: E,
    generator: G,
    registry: Arc<CollectionRegistry>,
    user_id: Option<String>,
    cache: Arc<ResponseCache<S>>,
    merger: RetrievalMerger,
    assembler: ContextAssembler,
    config: RagConfig,
    history: Arc<Mutex<Vec<ConversationTurn>>>,
}

impl<E, G, S> std::fmt::Debug for Assistant<E, G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("registry", &self.registry)
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .field("history_len", &self.history.lock().len())
            .finish_non_exhaustive()
    }
}

/// Prompt and sources prepared for one query.
struct Prepared {
    prompt: String,
    sources: Vec<MergedResult>,
    used_retrieval: bool,
}

impl<E, G, S> Assistant<E, G, S>
where
    E: EmbeddingProvider,
    G: GenerationProvider,
    S: DurableStore,
{
    /// Creates an assistant. The response cache persists through `cache_store`.
    pub fn new(
        embedder: E,
        generator: G,
        registry: Arc<CollectionRegistry>,
        cache_store: S,
        config: RagConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            registry,
            user_id: None,
            cache: Arc::new(ResponseCache::new(cache_store)),
            merger: RetrievalMerger::from_config(&config),
            assembler: ContextAssembler::from_config(&config),
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scopes retrieval to the personal collection of `user_id`.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// User whose personal collection is searched, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Answers `query`, replying in `language` when served from the cache.
    ///
    /// # Errors
    ///
    /// - [`RagError::GenerationTimeout`] if the provider reports [`GenerationTimeout`].
    /// - [`RagError::Generation`] for any other generation failure.
    pub async fn respond(&self, query: &str, language: &str) -> Result<AssistantResponse> {
        if let Some(text) = self.cache.get(query, language).await {
            debug!(language, "answered from response cache");
            self.record(query, &text);
            return Ok(AssistantResponse {
                text,
                sources: Vec::new(),
                used_retrieval: false,
                cached: true,
            });
        }

        let prepared = self.prepare(query).await;
        let raw = self
            .generator
            .generate(&prepared.prompt, &self.config.generation_params())
            .await
            .map_err(classify_generation_error)?;
        let text = clean_response(&raw);

        self.record(query, &text);
        if self.cache.is_common(query) {
            self.cache.put(query, &text, language).await;
        }

        Ok(AssistantResponse {
            text,
            sources: prepared.sources,
            used_retrieval: prepared.used_retrieval,
            cached: false,
        })
    }

    /// Streams the answer to `query` as events tagged with `stream_id`.
    ///
    /// A cached answer is emitted as a single chunk followed by [`StreamEvent::Done`]. Once the
    /// stream completes successfully the exchange is recorded in the history and a common query
    /// is stored in the cache. A timed out stream ends with the same message as
    /// [`RagError::GenerationTimeout`].
    pub async fn respond_streaming(
        &self,
        query: &str,
        language: &str,
        stream_id: StreamId,
    ) -> BoxStream<'static, StreamEvent>
    where
        S: 'static,
    {
        if let Some(text) = self.cache.get(query, language).await {
            self.record(query, &text);
            return stream::iter([
                StreamEvent::Chunk {
                    stream_id: stream_id.clone(),
                    text,
                },
                StreamEvent::Done { stream_id },
            ])
            .boxed();
        }

        let prepared = self.prepare(query).await;
        let history = Arc::clone(&self.history);
        let cache = self.cache.is_common(query).then(|| Arc::clone(&self.cache));
        let limit = self.history_limit();
        let query = query.to_string();
        let language = language.to_string();
        let mut buffer = String::new();

        self.generator
            .generate_stream(&prepared.prompt, &self.config.generation_params(), stream_id)
            .then(move |event| {
                let completed = match &event {
                    StreamEvent::Chunk { text, .. } => {
                        buffer.push_str(text);
                        None
                    }
                    StreamEvent::Done { .. } => Some(clean_response(&buffer)),
                    StreamEvent::Error { .. } => None,
                };
                let history = Arc::clone(&history);
                let cache = cache.clone();
                let query = query.clone();
                let language = language.clone();
                async move {
                    if let Some(text) = completed {
                        push_exchange(&history, &query, &text, limit);
                        if let Some(cache) = cache {
                            cache.put(&query, &text, &language).await;
                        }
                    }
                    classify_stream_error(event)
                }
            })
            .boxed()
    }

    /// Forgets the conversation so far.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Snapshot of the conversation, oldest turn first.
    #[must_use]
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().clone()
    }

    /// Response cache used for common queries.
    pub fn cache(&self) -> &ResponseCache<S> {
        &self.cache
    }

    /// Registry searched for every query.
    pub const fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    /// Active configuration.
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    async fn prepare(&self, query: &str) -> Prepared {
        let sources = self.retrieve(query).await;
        let context = self
            .assembler
            .assemble(&sources, self.config.max_context_length);
        let history = self.history.lock().clone();
        let prompt = compose_prompt(
            &context,
            &history,
            self.config.history_turns_in_prompt,
            query,
        );
        Prepared {
            prompt,
            used_retrieval: !context.is_empty(),
            sources,
        }
    }

    async fn retrieve(&self, query: &str) -> Vec<MergedResult> {
        let collections = self.registry.scope(self.user_id.as_deref());
        if collections.iter().all(|collection| collection.is_empty()) {
            return Vec::new();
        }

        let condensed = query.split_whitespace().collect::<Vec<_>>().join(" ");
        match self.embedder.embed(&condensed).await {
            Ok(embedding) => self.merger.retrieve(&collections, &embedding).await,
            Err(error) => {
                warn!(error = %error, "query embedding failed, answering without context");
                Vec::new()
            }
        }
    }

    fn record(&self, query: &str, response: &str) {
        push_exchange(&self.history, query, response, self.history_limit());
    }

    const fn history_limit(&self) -> usize {
        self.config.max_history_exchanges * 2
    }
}

fn push_exchange(
    history: &Mutex<Vec<ConversationTurn>>,
    query: &str,
    response: &str,
    limit: usize,
) {
    let mut history = history.lock();
    history.push(ConversationTurn::user(query));
    history.push(ConversationTurn::assistant(response));
    let excess = history.len().saturating_sub(limit);
    history.drain(..excess);
}

fn classify_generation_error(error: anyhow::Error) -> RagError {
    if error.downcast_ref::<GenerationTimeout>().is_some() {
        RagError::GenerationTimeout
    } else {
        RagError::Generation(normalize_error_message(&error.to_string()))
    }
}

fn classify_stream_error(event: StreamEvent) -> StreamEvent {
    match event {
        StreamEvent::Error {
            stream_id,
            message,
            timed_out,
        } => {
            let message = if timed_out {
                RagError::GenerationTimeout.to_string()
            } else {
                normalize_error_message(&message)
            };
            StreamEvent::Error {
                stream_id,
                message,
                timed_out,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CONTEXT_HEADER;
    use crate::persistence::MemoryStore;
    use crate::types::{CollectionKind, Document};
    use confidant_core::{Embedding, GenerationParams, Role};
    use futures::Stream;

    struct KeywordEmbedder;

    impl EmbeddingProvider for KeywordEmbedder {
        fn dim(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> confidant_core::Result<Embedding> {
            let text = text.to_lowercase();
            if text.contains("fail") {
                anyhow::bail!("encoder offline");
            }
            Ok(vec![
                if text.contains("sleep") { 1.0 } else { 0.0 },
                if text.contains("exercise") { 1.0 } else { 0.0 },
                0.1,
            ])
        }
    }

    #[derive(Default)]
    struct ScriptedGenerator {
        reply: String,
        timeout: bool,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                ..Self::default()
            }
        }
    }

    impl GenerationProvider for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> confidant_core::Result {
            self.prompts.lock().push(prompt.to_string());
            if self.timeout {
                return Err(GenerationTimeout.into());
            }
            if self.reply.is_empty() {
                anyhow::bail!("Failed to process query: Failed to process query: out of memory");
            }
            Ok(self.reply.clone())
        }

        fn generate_stream(
            &self,
            prompt: &str,
            _params: &GenerationParams,
            stream_id: StreamId,
        ) -> impl Stream<Item = StreamEvent> + Send + 'static {
            self.prompts.lock().push(prompt.to_string());
            if self.timeout {
                return stream::iter(vec![StreamEvent::timeout(stream_id)]);
            }
            let mut events: Vec<StreamEvent> = self
                .reply
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

    fn registry() -> Arc<CollectionRegistry> {
        let registry = CollectionRegistry::new(3);
        let shared = registry
            .create("shared_knowledge", CollectionKind::Shared)
            .unwrap();
        shared
            .add_documents(vec![
                Document::new(
                    "sleep_1",
                    "Adults need seven to nine hours of sleep for good health.",
                    vec![1.0, 0.0, 0.1],
                ),
                Document::new(
                    "exercise_1",
                    "Regular exercise lifts mood and improves sleep quality.",
                    vec![0.0, 1.0, 0.1],
                ),
            ])
            .unwrap();
        Arc::new(registry)
    }

    type TestAssistant = Assistant<KeywordEmbedder, ScriptedGenerator, MemoryStore>;

    fn assistant(generator: ScriptedGenerator) -> TestAssistant {
        Assistant::new(
            KeywordEmbedder,
            generator,
            registry(),
            MemoryStore::new(),
            RagConfig::default(),
        )
    }

    fn add_journal(registry: &CollectionRegistry, user_id: &str, id: &str, text: &str) {
        let name = CollectionRegistry::personal_collection_name(user_id);
        registry
            .create(&name, CollectionKind::Personal)
            .unwrap()
            .add_documents(vec![Document::new(id, text, vec![1.0, 0.0, 0.1])])
            .unwrap();
    }

    async fn stream_events(
        assistant: &TestAssistant,
        query: &str,
        stream_id: &str,
    ) -> Vec<StreamEvent> {
        assistant
            .respond_streaming(query, "en", StreamId::new(stream_id))
            .await
            .collect()
            .await
    }

    #[tokio::test]
    async fn retrieval_feeds_the_prompt() {
        let generator = ScriptedGenerator::replying("Aim for seven to nine hours.");
        let prompts = Arc::clone(&generator.prompts);
        let assistant = assistant(generator);

        let response = assistant
            .respond("How much sleep do I need?", "en")
            .await
            .unwrap();

        assert_eq!(response.text, "Aim for seven to nine hours.");
        assert!(response.used_retrieval);
        assert!(!response.cached);
        assert_eq!(response.sources[0].document_id, "sleep_1");

        let prompt = prompts.lock()[0].clone();
        assert!(prompt.contains(CONTEXT_HEADER));
        assert!(prompt.contains("seven to nine hours of sleep"));
        assert!(prompt.ends_with("User: How much sleep do I need?\nAssistant:"));
    }

    #[tokio::test]
    async fn common_queries_skip_generation() {
        let generator = ScriptedGenerator::replying("unused");
        let prompts = Arc::clone(&generator.prompts);
        let assistant = assistant(generator);

        let response = assistant.respond("Hello!", "en").await.unwrap();

        assert!(response.cached);
        assert!(!response.used_retrieval);
        assert!(!response.text.is_empty());
        assert!(prompts.lock().is_empty());
        assert_eq!(assistant.history().len(), 2);
    }

    #[tokio::test]
    async fn echoed_dialogue_is_removed() {
        let assistant = assistant(ScriptedGenerator::replying(
            "Exercise helps.\nUser: thanks\nAssistant: You're welcome.",
        ));

        let response = assistant.respond("Does exercise help?", "en").await.unwrap();
        assert_eq!(response.text, "Exercise helps.");
    }

    #[tokio::test]
    async fn history_is_bounded_and_replayed() {
        let generator = ScriptedGenerator::replying("Noted.");
        let prompts = Arc::clone(&generator.prompts);
        let assistant = assistant(generator);

        for i in 0..12 {
            assistant.respond(&format!("question {i}"), "en").await.unwrap();
        }

        let history = assistant.history();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "question 2");
        assert_eq!(history[0].role, Role::User);

        let last_prompt = prompts.lock().last().cloned().unwrap();
        assert!(last_prompt.contains(
            "User: question 10\nAssistant: Noted.\nUser: question 11\nAssistant:"
        ));
        assert!(!last_prompt.contains("question 8"));

        assistant.clear_history();
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn timeout_is_classified() {
        let assistant = assistant(ScriptedGenerator {
            timeout: true,
            ..ScriptedGenerator::default()
        });

        let err = assistant.respond("sleep tips", "en").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationTimeout));
        assert_eq!(err.to_string(), "the model is still loading, please try again");
    }

    #[tokio::test]
    async fn other_failures_are_normalized() {
        let assistant = assistant(ScriptedGenerator::default());

        let err = assistant.respond("sleep tips", "en").await.unwrap_err();
        match err {
            RagError::Generation(message) => assert_eq!(message, "out of memory"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_answers_without_context() {
        let generator = ScriptedGenerator::replying("I can still help.");
        let prompts = Arc::clone(&generator.prompts);
        let assistant = assistant(generator);

        let response = assistant.respond("this will fail", "en").await.unwrap();

        assert!(!response.used_retrieval);
        assert!(response.sources.is_empty());
        assert!(!prompts.lock()[0].contains(CONTEXT_HEADER));
    }

    #[tokio::test]
    async fn streaming_records_the_exchange_on_completion() {
        let assistant = assistant(ScriptedGenerator::replying("Keep a regular bedtime."));
        let id = StreamId::new("s-1");

        let events: Vec<StreamEvent> = assistant
            .respond_streaming("sleep routine?", "en", id.clone())
            .await
            .collect()
            .await;

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Chunk { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Keep a regular bedtime.");
        assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
        assert!(events.iter().all(|event| event.stream_id() == &id));

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Keep a regular bedtime.");
    }

    #[tokio::test]
    async fn personal_scope_excludes_other_users() {
        let registry = registry();
        add_journal(&registry, "1", "journal_1", "I slept badly after late sleep coffee.");
        add_journal(&registry, "2", "journal_2", "My sleep diary mentions night shifts.");

        let generator = ScriptedGenerator::replying("Try cutting coffee after noon.");
        let prompts = Arc::clone(&generator.prompts);
        let assistant = Assistant::new(
            KeywordEmbedder,
            generator,
            registry,
            MemoryStore::new(),
            RagConfig::default(),
        )
        .with_user("1");
        assert_eq!(assistant.user_id(), Some("1"));

        let response = assistant
            .respond("Why is my sleep poor?", "en")
            .await
            .unwrap();

        assert!(response.sources.iter().any(|hit| hit.collection == "user_1"));
        assert!(
            response
                .sources
                .iter()
                .all(|hit| hit.collection == "shared_knowledge" || hit.collection == "user_1")
        );
        let prompt = prompts.lock()[0].clone();
        assert!(prompt.contains("late sleep coffee"));
        assert!(!prompt.contains("night shifts"));
    }

    #[tokio::test]
    async fn anonymous_queries_read_only_shared_knowledge() {
        let registry = registry();
        add_journal(&registry, "2", "journal_2", "My sleep diary mentions night shifts.");
        let assistant = Assistant::new(
            KeywordEmbedder,
            ScriptedGenerator::replying("Keep a steady schedule."),
            registry,
            MemoryStore::new(),
            RagConfig::default(),
        );

        let response = assistant.respond("sleep schedule", "en").await.unwrap();

        assert!(!response.sources.is_empty());
        assert!(
            response
                .sources
                .iter()
                .all(|hit| hit.collection == "shared_knowledge")
        );
    }

    #[tokio::test]
    async fn streaming_timeout_is_classified() {
        let assistant = assistant(ScriptedGenerator {
            timeout: true,
            ..ScriptedGenerator::default()
        });

        let events = stream_events(&assistant, "sleep tips", "s-3").await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_timeout());
        assert!(matches!(
            &events[0],
            StreamEvent::Error { message, .. }
                if message == "the model is still loading, please try again"
        ));
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn streaming_caches_common_queries_on_completion() {
        let assistant = assistant(ScriptedGenerator::replying("Hello! How can I help today?"));
        assert!(assistant.cache().remove("hello", "en").await);

        let events = stream_events(&assistant, "Hello", "s-4").await;
        assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));

        assert_eq!(
            assistant.cache().get("hello", "en").await.as_deref(),
            Some("Hello! How can I help today?")
        );
    }

    #[tokio::test]
    async fn streaming_leaves_uncommon_queries_uncached() {
        let assistant = assistant(ScriptedGenerator::replying("Keep a regular bedtime."));

        stream_events(&assistant, "sleep routine?", "s-5").await;

        assert!(assistant.cache().get("sleep routine", "en").await.is_none());
    }

    #[tokio::test]
    async fn streaming_cached_answer_is_one_chunk() {
        let assistant = assistant(ScriptedGenerator::replying("unused"));

        let events: Vec<StreamEvent> = assistant
            .respond_streaming("hi", "es", StreamId::new("s-2"))
            .await
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Chunk { text, .. } if !text.is_empty()));
        assert!(events[1].is_terminal());
    }
}

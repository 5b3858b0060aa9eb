//! The response router: the tiered pipeline that answers one message.
//!
//! Tiers run once each, in order:
//!
//! 1. FAQ match (short-circuits everything else)
//! 2. knowledge retrieval into a context block
//! 3. system prompt installation or in-place refresh
//! 4. generation with the declared functions
//! 5. function dispatch and a second, function-free generation
//! 6. session update, conversation log and query log
//!
//! Upstream failures degrade instead of propagating: retrieval errors skip
//! the tier, generation errors become the fallback (or demo) reply, and
//! dispatch errors become an apology.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studentdesk_config::AppConfig;
use studentdesk_core::error::{DispatchError, KnowledgeError, ProviderError};
use studentdesk_core::function::{FunctionCall, FunctionDispatcher};
use studentdesk_core::knowledge::{KnowledgeRecord, KnowledgeStore, Partition, RetrievalMatch};
use studentdesk_core::message::{ConversationSession, Message};
use studentdesk_core::provider::{Completion, Provider, ProviderRequest};
use studentdesk_core::routing::{ResponseSource, RoutingDecision};
use studentdesk_telemetry::{ConversationSink, LoggedMessage};
use tracing::{debug, info, warn};

use crate::augment::{PromptAugmenter, build_context};
use crate::messages::Locale;
use crate::session::SessionStore;

/// Tunables for one router instance.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub faq_top_k: usize,
    pub faq_similarity_threshold: f32,
    pub faq_confidence_threshold: f32,
    pub rag_top_k: usize,
    pub rag_relevance_threshold: f32,
    pub generation_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub base_prompt: String,
    pub locale: Locale,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl RouterConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let locale: Locale = config.prompt.locale.parse().unwrap_or_default();
        let base_prompt = config
            .prompt
            .base_prompt
            .clone()
            .unwrap_or_else(|| locale.phrases().base_prompt.to_string());

        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: Some(config.provider.max_tokens),
            faq_top_k: config.routing.faq_top_k,
            faq_similarity_threshold: config.routing.faq_similarity_threshold,
            faq_confidence_threshold: config.routing.faq_confidence_threshold,
            rag_top_k: config.routing.rag_top_k,
            rag_relevance_threshold: config.routing.rag_relevance_threshold,
            generation_timeout: Duration::from_secs(config.routing.generation_timeout_secs),
            retrieval_timeout: Duration::from_secs(config.routing.retrieval_timeout_secs),
            base_prompt,
            locale,
        }
    }
}

/// Errors the router reports to its caller. Upstream failures never
/// appear here.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// An answer together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedReply {
    pub response: String,
    pub decision: RoutingDecision,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

/// The response shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub source: ResponseSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<RoutedReply> for ChatResponse {
    fn from(reply: RoutedReply) -> Self {
        Self {
            response: reply.response,
            source: reply.decision.source,
            confidence: reply.decision.confidence,
            session_id: reply.session_id,
            timestamp: reply.timestamp,
        }
    }
}

/// Run `fut` with a deadline, mapping expiry to the caller's error type.
async fn with_deadline<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

pub struct ResponseRouter {
    provider: Arc<dyn Provider>,
    dispatcher: Arc<dyn FunctionDispatcher>,
    sessions: Arc<SessionStore>,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    sink: Option<Arc<dyn ConversationSink>>,
    augmenter: PromptAugmenter,
    config: RouterConfig,
}

impl ResponseRouter {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Arc<dyn FunctionDispatcher>,
        sessions: Arc<SessionStore>,
        config: RouterConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            sessions,
            knowledge: None,
            sink: None,
            augmenter: PromptAugmenter::new(config.locale),
            config,
        }
    }

    /// Attach the store used for the FAQ, retrieval and query-log tiers.
    pub fn with_knowledge(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(store);
        self
    }

    /// Attach a conversation log.
    pub fn with_sink(mut self, sink: Arc<dyn ConversationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    /// Answer one user message for `session_id`.
    ///
    /// Requests for the same session are processed one at a time, in the
    /// order they reach the session lock.
    pub async fn handle(&self, session_id: &str, text: &str) -> Result<RoutedReply, RouterError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(RouterError::InvalidRequest("session_id must not be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(RouterError::InvalidRequest("message must not be empty".into()));
        }

        let mut session = self.sessions.lock(session_id).await;
        info!(session_id, "Routing message");

        if let Some(faq) = self.faq_tier(text).await {
            let decision = RoutingDecision::faq(faq.score);
            info!(session_id, score = faq.score, "Answered from FAQ");
            return Ok(self.finish(session_id, text, faq.answer_or_content, decision).await);
        }

        let context = self.retrieval_tier(text).await;
        let rag_used = !context.is_empty();

        self.prepare_prompt(&mut session, &context)?;
        session
            .append(Message::user(text))
            .map_err(|e| RouterError::Internal(e.to_string()))?;

        let (answer, decision) = match self.generate(&session, true).await {
            Ok(Completion::Text { content }) => {
                let source = if rag_used {
                    ResponseSource::Rag
                } else {
                    ResponseSource::Generation
                };
                (content, RoutingDecision::new(source).with_rag(rag_used))
            }
            Ok(Completion::FunctionCall { name, arguments }) => {
                match self.function_tier(&mut session, &name, &arguments).await {
                    Ok(answer) => (
                        answer,
                        RoutingDecision::new(ResponseSource::Function)
                            .with_rag(rag_used)
                            .with_function(name),
                    ),
                    Err(degraded) => {
                        let decision = degraded.with_rag(rag_used);
                        (self.degraded_text(&decision, text), decision)
                    }
                }
            }
            Err(e) => {
                let decision = self.degrade(session_id, &e).with_rag(rag_used);
                (self.degraded_text(&decision, text), decision)
            }
        };

        let assistant = Message::assistant(answer.clone());
        let assistant = decision
            .to_metadata()
            .into_iter()
            .fold(assistant, |msg, (k, v)| msg.with_metadata(&k, v));
        session
            .append(assistant)
            .map_err(|e| RouterError::Internal(e.to_string()))?;

        Ok(self.finish(session_id, text, answer, decision).await)
    }

    /// Tier 1: the best FAQ candidate, if it clears both thresholds.
    async fn faq_tier(&self, text: &str) -> Option<RetrievalMatch> {
        let store = self.knowledge.as_ref()?;
        let hits = match with_deadline(
            self.config.retrieval_timeout,
            store.search(text, self.config.faq_top_k, Partition::Faq),
            || KnowledgeError::Timeout(self.config.retrieval_timeout.as_secs()),
        )
        .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "FAQ search failed, skipping tier");
                return None;
            }
        };

        let best = hits
            .iter()
            .filter(|h| h.score >= self.config.faq_similarity_threshold)
            .find_map(RetrievalMatch::from_faq_hit)?;

        debug!(score = best.score, question = %best.source_text, "Best FAQ candidate");
        (best.score >= self.config.faq_confidence_threshold).then_some(best)
    }

    /// Tier 2: relevant knowledge rendered as a context block, or empty.
    async fn retrieval_tier(&self, text: &str) -> String {
        let Some(store) = &self.knowledge else {
            return String::new();
        };
        let hits = match with_deadline(
            self.config.retrieval_timeout,
            store.search(text, self.config.rag_top_k, Partition::Knowledge),
            || KnowledgeError::Timeout(self.config.retrieval_timeout.as_secs()),
        )
        .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Knowledge retrieval failed, skipping tier");
                return String::new();
            }
        };

        let matches: Vec<RetrievalMatch> = hits
            .iter()
            .filter(|h| h.score >= self.config.rag_relevance_threshold)
            .map(RetrievalMatch::from_knowledge_hit)
            .collect();
        if !matches.is_empty() {
            info!(count = matches.len(), "Retrieved knowledge context");
        }
        build_context(&matches)
    }

    /// Tier 3: install the system prompt on the first turn, refresh it in
    /// place when new context arrived on a later one.
    fn prepare_prompt(&self, session: &mut ConversationSession, context: &str) -> Result<(), RouterError> {
        if session.system_message().is_some() && context.is_empty() {
            return Ok(());
        }
        let prompt = self.augmenter.augment(&self.config.base_prompt, context);
        session
            .replace_system(Message::system(prompt))
            .map_err(|e| RouterError::Internal(e.to_string()))
    }

    async fn generate(&self, session: &ConversationSession, with_functions: bool) -> Result<Completion, ProviderError> {
        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages: session.messages().to_vec(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            functions: if with_functions {
                self.dispatcher.definitions()
            } else {
                Vec::new()
            },
        };
        let limit = self.config.generation_timeout;
        let response = with_deadline(limit, self.provider.complete(request), || {
            ProviderError::Timeout(format!("no response within {}s", limit.as_secs()))
        })
        .await?;
        debug!(model = %response.model, usage = ?response.usage, "Generation complete");
        Ok(response.completion)
    }

    /// Tier 5. `Ok` carries the final answer; `Err` carries the degraded
    /// decision when the second generation failed.
    async fn function_tier(
        &self,
        session: &mut ConversationSession,
        name: &str,
        arguments: &str,
    ) -> Result<String, RoutingDecision> {
        let phrases = self.config.locale.phrases();

        let call = match FunctionCall::parse(name, arguments) {
            Ok(call) => call,
            Err(e) => {
                warn!(function = name, error = %e, "Refusing malformed function request");
                return Ok(phrases.refusal.to_string());
            }
        };

        info!(function = %call.name, "Dispatching function");
        let result = match self.dispatcher.dispatch(&call).await {
            Ok(outcome) => outcome.into_text(),
            Err(e @ (DispatchError::InvalidArguments { .. } | DispatchError::MissingArgument { .. })) => {
                warn!(function = %call.name, error = %e, "Refusing function call with bad arguments");
                return Ok(phrases.refusal.to_string());
            }
            Err(e) => {
                warn!(function = %call.name, error = %e, "Function dispatch failed");
                return Ok(phrases.dispatch_apology.to_string());
            }
        };

        if session
            .append(Message::function(call.name.as_str(), result))
            .is_err()
        {
            return Ok(phrases.dispatch_apology.to_string());
        }

        match self.generate(session, false).await {
            Ok(Completion::Text { content }) => Ok(content),
            Ok(Completion::FunctionCall { name, .. }) => {
                let e = ProviderError::MalformedResponse(format!(
                    "function call to {name} after functions were withdrawn"
                ));
                Err(self.degrade(&session.session_id, &e).with_function(call.name.as_str()))
            }
            Err(e) => Err(self.degrade(&session.session_id, &e).with_function(call.name.as_str())),
        }
    }

    fn degrade(&self, session_id: &str, error: &ProviderError) -> RoutingDecision {
        let source = match error {
            ProviderError::NotConfigured(_) => ResponseSource::Demo,
            _ => ResponseSource::Fallback,
        };
        warn!(session_id, error = %error, source = %source, "Generation failed, degrading");
        RoutingDecision::new(source)
    }

    fn degraded_text(&self, decision: &RoutingDecision, user_text: &str) -> String {
        let phrases = self.config.locale.phrases();
        match decision.source {
            ResponseSource::Demo => phrases.demo(user_text),
            _ => phrases.fallback(user_text),
        }
    }

    /// Tier 6 side effects, all best-effort.
    async fn finish(
        &self,
        session_id: &str,
        user_text: &str,
        answer: String,
        decision: RoutingDecision,
    ) -> RoutedReply {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink
                .record_exchange(
                    session_id,
                    LoggedMessage::user(user_text),
                    LoggedMessage::assistant(answer.clone(), &decision),
                )
                .await
            {
                warn!(session_id, error = %e, sink = sink.name(), "Conversation logging failed");
            }
        }

        if !decision.source.is_degraded() {
            self.log_query(session_id, user_text, &answer, decision.source).await;
        }

        info!(session_id, source = %decision.source, rag_used = decision.rag_used, "Response ready");
        RoutedReply {
            response: answer,
            decision,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
        }
    }

    async fn log_query(&self, session_id: &str, query: &str, answer: &str, source: ResponseSource) {
        let Some(store) = &self.knowledge else {
            return;
        };
        let mut metadata = serde_json::Map::new();
        metadata.insert("response".into(), answer.into());
        metadata.insert("session_id".into(), session_id.into());
        metadata.insert("source".into(), source.as_str().into());
        metadata.insert("timestamp".into(), Utc::now().to_rfc3339().into());

        let record = KnowledgeRecord {
            document: query.to_string(),
            metadata,
        };
        if let Err(e) = with_deadline(
            self.config.retrieval_timeout,
            store.add(Partition::QueryLog, record),
            || KnowledgeError::Timeout(self.config.retrieval_timeout.as_secs()),
        )
        .await
        {
            warn!(session_id, error = %e, "Query logging failed");
        }
    }
}

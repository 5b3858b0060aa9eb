//! Shared test doubles for router tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use studentdesk_core::error::{DispatchError, KnowledgeError, ProviderError};
use studentdesk_core::function::{FunctionCall, FunctionDefinition, FunctionDispatcher, FunctionOutcome};
use studentdesk_core::knowledge::{KnowledgeRecord, KnowledgeStore, Partition, SearchHit, StoredRecord};
use studentdesk_core::provider::{Completion, Provider, ProviderRequest, ProviderResponse};
use studentdesk_telemetry::{ConversationSink, LogError, LoggedMessage};

/// Returns scripted completions in order and records every request.
///
/// Panics if called more times than it has responses.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<Completion, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more scripted responses");
        next.map(|completion| ProviderResponse {
            completion,
            usage: None,
            model: "scripted-model".into(),
        })
    }
}

pub fn faq_hit(question: &str, answer: &str, score: f32) -> SearchHit {
    let mut metadata = serde_json::Map::new();
    metadata.insert("answer".into(), answer.into());
    metadata.insert("category".into(), "general".into());
    SearchHit {
        document: question.into(),
        metadata,
        score,
    }
}

pub fn knowledge_hit(title: &str, content: &str, score: f32) -> SearchHit {
    let mut metadata = serde_json::Map::new();
    metadata.insert("title".into(), title.into());
    metadata.insert("content".into(), content.into());
    SearchHit {
        document: format!("{title}\n{content}"),
        metadata,
        score,
    }
}

/// Canned search results per partition, or failure on every call.
#[derive(Default)]
pub struct StubStore {
    faq: Vec<SearchHit>,
    knowledge: Vec<SearchHit>,
    fail: bool,
    query_log: Mutex<Vec<KnowledgeRecord>>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_faq(mut self, hits: Vec<SearchHit>) -> Self {
        self.faq = hits;
        self
    }

    pub fn with_knowledge(mut self, hits: Vec<SearchHit>) -> Self {
        self.knowledge = hits;
        self
    }

    pub fn query_log(&self) -> Vec<KnowledgeRecord> {
        self.query_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeStore for StubStore {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, _text: &str, top_k: usize, partition: Partition) -> Result<Vec<SearchHit>, KnowledgeError> {
        if self.fail {
            return Err(KnowledgeError::QueryFailed("stub failure".into()));
        }
        let hits = match partition {
            Partition::Faq => &self.faq,
            Partition::Knowledge => &self.knowledge,
            Partition::QueryLog => return Ok(Vec::new()),
        };
        Ok(hits.iter().take(top_k).cloned().collect())
    }

    async fn add(&self, partition: Partition, record: KnowledgeRecord) -> Result<String, KnowledgeError> {
        if self.fail {
            return Err(KnowledgeError::Storage("stub failure".into()));
        }
        if partition == Partition::QueryLog {
            self.query_log.lock().unwrap().push(record);
        }
        Ok("stub-id".into())
    }

    async fn list(&self, _partition: Partition) -> Result<Vec<StoredRecord>, KnowledgeError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _partition: Partition, _ids: &[String]) -> Result<usize, KnowledgeError> {
        Ok(0)
    }

    async fn count(&self, _partition: Partition) -> Result<usize, KnowledgeError> {
        Ok(0)
    }
}

/// Returns one canned result and counts dispatches.
pub struct CountingDispatcher {
    result: Result<FunctionOutcome, DispatchError>,
    calls: AtomicUsize,
}

impl CountingDispatcher {
    pub fn answering(text: &str) -> Self {
        Self {
            result: Ok(FunctionOutcome::Answer(text.into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: DispatchError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FunctionDispatcher for CountingDispatcher {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        vec![FunctionDefinition {
            name: "calculate_tuition".into(),
            description: "test".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]
    }

    async fn dispatch(&self, _call: &FunctionCall) -> Result<FunctionOutcome, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub struct FailingSink;

#[async_trait]
impl ConversationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn record(&self, _session_id: &str, _message: LoggedMessage) -> Result<(), LogError> {
        Err(LogError::Serialization("sink down".into()))
    }
}

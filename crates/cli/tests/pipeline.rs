//! End-to-end tests for the answer pipeline.
//!
//! These run the real knowledge store, catalog dispatcher, session store and
//! conversation sink, with a scripted generation backend standing in for the
//! remote model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use studentdesk_core::error::ProviderError;
use studentdesk_core::knowledge::{KnowledgeStore, Partition};
use studentdesk_core::message::Role;
use studentdesk_core::provider::{Completion, Provider, ProviderRequest, ProviderResponse};
use studentdesk_core::routing::ResponseSource;
use studentdesk_functions::{Catalog, CatalogDispatcher};
use studentdesk_knowledge::{HashingEmbedder, InMemoryKnowledgeStore, KnowledgeBase};
use studentdesk_router::{ResponseRouter, RouterConfig, SessionStore};
use studentdesk_telemetry::InMemorySink;

// ── Scripted provider ─────────────────────────────────────────────────────

/// Returns scripted completions in sequence and records every request.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<Completion, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted after {} calls", self.calls()));
        next.map(|completion| ProviderResponse {
            completion,
            usage: None,
            model: "e2e-model".into(),
        })
    }
}

/// Answers with the latest user message, so ordering can be checked.
struct EchoProvider;

#[async_trait::async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        tokio::task::yield_now().await;
        Ok(ProviderResponse {
            completion: Completion::text(format!("echo: {last_user}")),
            usage: None,
            model: "echo".into(),
        })
    }
}

// ── Harness ───────────────────────────────────────────────────────────────

struct Harness {
    router: Arc<ResponseRouter>,
    knowledge: KnowledgeBase,
    store: Arc<dyn KnowledgeStore>,
    sink: Arc<InMemorySink>,
}

fn harness(provider: Arc<dyn Provider>) -> Harness {
    let store: Arc<dyn KnowledgeStore> =
        Arc::new(InMemoryKnowledgeStore::new(Arc::new(HashingEmbedder::default())));
    let knowledge = KnowledgeBase::new(Arc::clone(&store), 1000, 200);
    let dispatcher = Arc::new(CatalogDispatcher::new(Arc::new(Catalog::builtin().unwrap())));
    let sessions = Arc::new(SessionStore::new(100, None));
    let sink = Arc::new(InMemorySink::new());

    let router = ResponseRouter::new(provider, dispatcher, sessions, RouterConfig::default())
        .with_knowledge(Arc::clone(&store))
        .with_sink(sink.clone());

    Harness {
        router: Arc::new(router),
        knowledge,
        store,
        sink,
    }
}

fn system_count(messages: &[studentdesk_core::message::Message]) -> usize {
    messages.iter().filter(|m| m.role == Role::System).count()
}

// ── FAQ tier ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn faq_match_answers_without_generation() {
    let provider = ScriptedProvider::new(vec![]);
    let h = harness(provider.clone());
    h.knowledge
        .add_faq("What are the library hours?", "The library is open 7:00-22:00.", "services")
        .await
        .unwrap();

    let reply = h.router.handle("s1", "What are the library hours?").await.unwrap();

    assert_eq!(reply.response, "The library is open 7:00-22:00.");
    assert_eq!(reply.decision.source, ResponseSource::Faq);
    assert!(reply.decision.confidence.unwrap() >= 0.8);
    assert_eq!(provider.calls(), 0);
    assert_eq!(h.store.count(Partition::QueryLog).await.unwrap(), 1);

    let log = h.sink.session("s1").await.unwrap();
    assert_eq!(log.messages.len(), 2);
    assert_eq!(log.stats.response_sources["faq"], 1);
}

// ── Retrieval tier ────────────────────────────────────────────────────────

#[tokio::test]
async fn retrieved_knowledge_lands_in_the_system_prompt() {
    let provider = ScriptedProvider::new(vec![Ok(Completion::text("Permits cost 500,000 VND."))]);
    let h = harness(provider.clone());
    h.knowledge
        .add_document_from_text(
            "Parking Permits",
            "Parking permits cost 500,000 VND per semester at the security office.",
            "services",
        )
        .await
        .unwrap();

    let reply = h
        .router
        .handle("s1", "How much do parking permits cost?")
        .await
        .unwrap();

    assert_eq!(reply.decision.source, ResponseSource::Rag);
    assert!(reply.decision.rag_used);

    let request = &provider.requests()[0];
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0].content.contains("📚 Parking Permits"));
    assert!(request.messages[0].content.contains("500,000 VND per semester"));
    assert!(!request.functions.is_empty());
}

#[tokio::test]
async fn session_keeps_a_single_system_message() {
    let provider = ScriptedProvider::new(vec![
        Ok(Completion::text("first")),
        Ok(Completion::text("second")),
        Ok(Completion::text("third")),
    ]);
    let h = harness(provider.clone());
    h.knowledge
        .add_document_from_text("Dormitory", "Dormitory check-in starts in August.", "housing")
        .await
        .unwrap();

    h.router.handle("s1", "hello").await.unwrap();
    h.router.handle("s1", "when is dormitory check-in?").await.unwrap();
    h.router.handle("s1", "thanks").await.unwrap();

    let session = h.router.sessions().snapshot("s1").await.unwrap();
    assert_eq!(system_count(session.messages()), 1);
    assert_eq!(session.messages()[0].role, Role::System);
    assert_eq!(session.len(), 7);

    for request in provider.requests() {
        assert_eq!(system_count(&request.messages), 1);
    }
}

// ── Function tier ─────────────────────────────────────────────────────────

async fn tuition_total(arguments: &str) -> String {
    let provider = ScriptedProvider::new(vec![
        Ok(Completion::function_call("calculate_tuition", arguments)),
        Ok(Completion::text("Here is your tuition estimate.")),
    ]);
    let h = harness(provider.clone());

    let reply = h.router.handle("s1", "How much is tuition?").await.unwrap();
    assert_eq!(reply.decision.source, ResponseSource::Function);
    assert_eq!(reply.decision.function.as_deref(), Some("calculate_tuition"));
    assert_eq!(reply.response, "Here is your tuition estimate.");
    assert_eq!(provider.calls(), 2);

    let second = &provider.requests()[1];
    assert!(second.functions.is_empty());
    let function_message = second.messages.last().unwrap();
    assert_eq!(function_message.role, Role::Function);
    assert_eq!(function_message.function_name.as_deref(), Some("calculate_tuition"));
    function_message.content.clone()
}

#[tokio::test]
async fn tuition_includes_fees_by_default() {
    let result = tuition_total(r#"{"credit_hours": 3}"#).await;
    assert!(result.contains("✅ Total: 4,950,000 VND"), "{result}");
}

#[tokio::test]
async fn tuition_without_fees() {
    let result = tuition_total(r#"{"credit_hours": 3, "additional_fees": false}"#).await;
    assert!(result.contains("✅ Total: 4,500,000 VND"), "{result}");
}

#[tokio::test]
async fn tuition_graduate_rate() {
    let result =
        tuition_total(r#"{"credit_hours": 3, "student_type": "graduate", "additional_fees": false}"#).await;
    assert!(result.contains("✅ Total: 7,500,000 VND"), "{result}");
}

#[tokio::test]
async fn course_lookup_returns_records_matching_any_filter() {
    let provider = ScriptedProvider::new(vec![
        Ok(Completion::function_call(
            "get_course_info",
            r#"{"course_id": "CS201", "instructor": "Brown"}"#,
        )),
        Ok(Completion::text("CS201 it is.")),
    ]);
    let h = harness(provider.clone());

    h.router.handle("s1", "Tell me about CS201 with Brown").await.unwrap();

    let result = provider.requests()[1].messages.last().unwrap().content.clone();
    // CS201 matches by ID, MATH101 by instructor
    assert!(result.starts_with("📚 CS201 - "), "{result}");
    assert!(result.contains("Dr. Johnson"), "{result}");
    assert!(result.contains("📚 MATH101 - "), "{result}");
    assert!(result.contains("Dr. Brown"), "{result}");
    assert!(!result.contains("📚 CS301"), "{result}");
}

#[tokio::test]
async fn undeclared_function_is_refused_without_dispatch() {
    let provider = ScriptedProvider::new(vec![Ok(Completion::function_call("drop_all_grades", "{}"))]);
    let h = harness(provider.clone());

    let reply = h.router.handle("s1", "Please clear my grades").await.unwrap();

    assert_eq!(reply.response, "Sorry, I cannot process this request.");
    assert_eq!(reply.decision.source, ResponseSource::Function);
    assert_eq!(reply.decision.function.as_deref(), Some("drop_all_grades"));
    assert_eq!(provider.calls(), 1);

    let session = h.router.sessions().snapshot("s1").await.unwrap();
    assert!(session.messages().iter().all(|m| m.role != Role::Function));
}

// ── Degraded paths ────────────────────────────────────────────────────────

#[tokio::test]
async fn fallback_is_logged_but_not_query_logged() {
    let provider = ScriptedProvider::new(vec![Err(ProviderError::ApiError {
        status_code: 503,
        message: "overloaded".into(),
    })]);
    let h = harness(provider.clone());

    let reply = h.router.handle("s1", "Where is the registrar?").await.unwrap();

    assert_eq!(reply.decision.source, ResponseSource::Fallback);
    assert!(reply.response.contains("Where is the registrar?"));

    let log = h.sink.session("s1").await.unwrap();
    assert_eq!(log.messages.len(), 2);
    assert_eq!(log.messages[1].source, Some(ResponseSource::Fallback));
    assert_eq!(h.store.count(Partition::QueryLog).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_api_key_answers_in_demo_mode() {
    let provider = ScriptedProvider::new(vec![Err(ProviderError::NotConfigured("no key".into()))]);
    let h = harness(provider);

    let reply = h.router.handle("s1", "Hi there").await.unwrap();
    assert_eq!(reply.decision.source, ResponseSource::Demo);
    assert!(reply.response.contains("demo mode"));
}

// ── Concurrency ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_on_one_session_do_not_interleave() {
    let h = harness(Arc::new(EchoProvider));
    let mut tasks = Vec::new();
    for i in 0..12 {
        let router = Arc::clone(&h.router);
        tasks.push(tokio::spawn(async move {
            router.handle("shared", &format!("question {i}")).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let session = h.router.sessions().snapshot("shared").await.unwrap();
    let messages = session.messages();
    assert_eq!(messages.len(), 1 + 12 * 2);
    assert_eq!(system_count(messages), 1);

    let mut seen = Vec::new();
    for pair in messages[1..].chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        seen.push(pair[0].content.clone());
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 12);
}

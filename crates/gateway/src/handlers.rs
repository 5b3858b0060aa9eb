//! Request handlers and their wire types.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studentdesk_core::error::DispatchError;
use studentdesk_core::function::FunctionCall;
use studentdesk_core::message::Message;
use studentdesk_knowledge::{DocumentSummary, FaqEntry, KnowledgeStats};
use studentdesk_router::{ChatResponse, RouterError};
use studentdesk_telemetry::Analytics;
use tracing::{debug, warn};

use crate::SharedState;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            session_id: None,
        }),
    )
}

/// A 500 with the localized generic text; the detail only goes to the log.
fn internal(state: &SharedState, context: &str, e: impl std::fmt::Display) -> ApiError {
    warn!(error = %e, "{}", context);
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        state.router.locale().phrases().internal_error,
    )
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, format!("{field} must not be empty")));
    }
    Ok(())
}

// ── Chat ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Accepted for client compatibility; speech output is not produced
    #[serde(default)]
    pub include_audio: bool,
}

fn default_session_id() -> String {
    "default".into()
}

/// `POST /api/chat`
pub async fn chat(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.include_audio {
        debug!(session_id = %payload.session_id, "Audio requested, replying with text only");
    }

    let result = state.router.handle(&payload.session_id, &payload.message).await;
    match result {
        Ok(reply) => Ok(Json(reply.into())),
        Err(RouterError::InvalidRequest(reason)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: reason,
                session_id: Some(payload.session_id),
            }),
        )),
        Err(RouterError::Internal(reason)) => {
            warn!(session_id = %payload.session_id, error = %reason, "Chat request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: state.router.locale().phrases().internal_error.to_string(),
                    session_id: Some(payload.session_id),
                }),
            ))
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub generation: bool,
    pub knowledge_store: bool,
    pub conversation_log: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<KnowledgeStats>,
}

/// `GET /api/health`
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let generation = state.provider.health_check().await.unwrap_or(false);
    let knowledge = match state.knowledge.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!(error = %e, "Knowledge store health check failed");
            None
        }
    };

    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: Utc::now(),
        services: ServiceStatus {
            generation,
            knowledge_store: knowledge.is_some(),
            conversation_log: state.log.is_some(),
            active_sessions: state.router.sessions().len(),
        },
        knowledge,
    })
}

// ── Knowledge ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadTextRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadTextResponse {
    pub message: String,
    pub title: String,
    pub chunks: usize,
}

/// `POST /api/knowledge/upload-text`
pub async fn upload_text(
    State(state): State<SharedState>,
    Json(payload): Json<UploadTextRequest>,
) -> Result<Json<UploadTextResponse>, ApiError> {
    require("title", &payload.title)?;
    require("content", &payload.content)?;

    let ids = state
        .knowledge
        .add_document_from_text(payload.title.trim(), &payload.content, &payload.category)
        .await
        .map_err(|e| internal(&state, "Document upload failed", e))?;

    Ok(Json(UploadTextResponse {
        message: "Document added to knowledge base".into(),
        title: payload.title.trim().to_string(),
        chunks: ids.len(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub count: usize,
}

/// `GET /api/knowledge/documents`
pub async fn list_documents(State(state): State<SharedState>) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state
        .knowledge
        .list_documents()
        .await
        .map_err(|e| internal(&state, "Listing documents failed", e))?;
    let count = documents.len();
    Ok(Json(DocumentListResponse { documents, count }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub message: String,
    pub title: String,
    pub chunks_removed: usize,
}

/// `DELETE /api/knowledge/documents/{title}`
pub async fn delete_document(
    State(state): State<SharedState>,
    Path(title): Path<String>,
) -> Result<Json<DeleteDocumentResponse>, ApiError> {
    let removed = state
        .knowledge
        .delete_document(&title)
        .await
        .map_err(|e| internal(&state, "Deleting document failed", e))?;

    if removed == 0 {
        return Err(error(StatusCode::NOT_FOUND, format!("No document titled '{title}'")));
    }
    Ok(Json(DeleteDocumentResponse {
        message: "Document deleted".into(),
        title,
        chunks_removed: removed,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaqListResponse {
    pub faqs: Vec<FaqEntry>,
    pub count: usize,
}

/// `GET /api/knowledge/faqs`
pub async fn list_faqs(State(state): State<SharedState>) -> Result<Json<FaqListResponse>, ApiError> {
    let faqs = state
        .knowledge
        .export_faqs()
        .await
        .map_err(|e| internal(&state, "Listing FAQs failed", e))?;
    let count = faqs.len();
    Ok(Json(FaqListResponse { faqs, count }))
}

#[derive(Debug, Deserialize)]
pub struct AddFaqRequest {
    pub question: String,
    pub answer: String,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddFaqResponse {
    pub id: String,
    pub message: String,
}

/// `POST /api/knowledge/faqs`
pub async fn add_faq(
    State(state): State<SharedState>,
    Json(payload): Json<AddFaqRequest>,
) -> Result<(StatusCode, Json<AddFaqResponse>), ApiError> {
    require("question", &payload.question)?;
    require("answer", &payload.answer)?;

    let id = state
        .knowledge
        .add_faq(payload.question.trim(), payload.answer.trim(), &payload.category)
        .await
        .map_err(|e| internal(&state, "Adding FAQ failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(AddFaqResponse {
            id,
            message: "FAQ added".into(),
        }),
    ))
}

// ── Functions ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub function: String,
    pub result: String,
    pub empty_match: bool,
}

fn dispatch_status(e: &DispatchError) -> StatusCode {
    match e {
        DispatchError::UnknownFunction(_) => StatusCode::NOT_FOUND,
        DispatchError::MissingArgument { .. } | DispatchError::InvalidArguments { .. } => StatusCode::BAD_REQUEST,
        DispatchError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `POST /api/functions/{name}`. The body is the JSON argument object; an
/// empty body means no arguments.
pub async fn call_function(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<FunctionResponse>, ApiError> {
    let arguments = std::str::from_utf8(&body)
        .map_err(|_| error(StatusCode::BAD_REQUEST, "Function arguments must be UTF-8 JSON"))?;
    let outcome = match FunctionCall::parse(&name, arguments) {
        Ok(call) => state.dispatcher.dispatch(&call).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(outcome) => Ok(Json(FunctionResponse {
            function: name,
            empty_match: outcome.is_empty_match(),
            result: outcome.into_text(),
        })),
        Err(e) => {
            debug!(function = %name, error = %e, "Direct function call rejected");
            Err(error(dispatch_status(&e), e.to_string()))
        }
    }
}

// ── Sessions & analytics ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub user_turns: usize,
    pub messages: Vec<Message>,
}

/// `GET /api/sessions/{id}`
pub async fn session_transcript(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state
        .router
        .sessions()
        .snapshot(&id)
        .await
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No active session '{id}'")))?;

    Ok(Json(TranscriptResponse {
        session_id: id,
        user_turns: session.user_turns(),
        messages: session.messages().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

/// `GET /api/analytics?days=N`
pub async fn analytics(
    State(state): State<SharedState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<Analytics>, ApiError> {
    let log = state
        .log
        .as_ref()
        .ok_or_else(|| error(StatusCode::SERVICE_UNAVAILABLE, "Conversation logging is disabled"))?;

    log.analytics(params.days)
        .map(Json)
        .map_err(|e| internal(&state, "Computing analytics failed", e))
}

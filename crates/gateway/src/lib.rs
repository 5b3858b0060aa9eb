//! HTTP API gateway for studentdesk.
//!
//! A thin axum surface over the response router: chat, health, knowledge
//! management, direct function calls, session transcripts and analytics.
//! [`AppState::bootstrap`] assembles the services from configuration.

pub mod bootstrap;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use bootstrap::{AppState, BootstrapError};

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the Axum router with all API routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/health", get(handlers::health))
        .route("/api/knowledge/upload-text", post(handlers::upload_text))
        .route("/api/knowledge/documents", get(handlers::list_documents))
        .route("/api/knowledge/documents/{title}", delete(handlers::delete_document))
        .route("/api/knowledge/faqs", get(handlers::list_faqs).post(handlers::add_faq))
        .route("/api/functions/{name}", post(handlers::call_function))
        .route("/api/sessions/{id}", get(handlers::session_transcript))
        .route("/api/analytics", get(handlers::analytics))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: studentdesk_config::AppConfig) -> Result<(), BootstrapError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(AppState::bootstrap(&config).await?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BootstrapError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
    info!(addr = %addr, "Gateway listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| BootstrapError::Serve(e.to_string()))
}

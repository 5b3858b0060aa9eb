//! Service assembly from configuration.

use std::sync::Arc;
use std::time::Duration;

use studentdesk_config::{AppConfig, EmbedderKind};
use studentdesk_core::error::KnowledgeError;
use studentdesk_core::function::FunctionDispatcher;
use studentdesk_core::provider::Provider;
use studentdesk_functions::{Catalog, CatalogDispatcher};
use studentdesk_knowledge::{Embedder, HashingEmbedder, InMemoryKnowledgeStore, KnowledgeBase, ProviderEmbedder};
use studentdesk_router::{ResponseRouter, RouterConfig, SessionStore};
use studentdesk_telemetry::FileConversationLog;
use tracing::{info, warn};

/// Everything the HTTP handlers and the CLI need, built once.
pub struct AppState {
    pub router: Arc<ResponseRouter>,
    pub knowledge: Arc<KnowledgeBase>,
    pub dispatcher: Arc<dyn FunctionDispatcher>,
    pub provider: Arc<dyn Provider>,
    /// `None` when conversation logging is disabled or its directory is unusable
    pub log: Option<Arc<FileConversationLog>>,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("knowledge store unavailable: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("server error: {0}")]
    Serve(String),
}

fn build_embedder(config: &AppConfig, provider: &Arc<dyn Provider>) -> Arc<dyn Embedder> {
    match config.knowledge.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.knowledge.dimensions)),
        EmbedderKind::Provider => Arc::new(ProviderEmbedder::new(
            Arc::clone(provider),
            config.knowledge.embedding_model.clone(),
        )),
    }
}

fn open_log(config: &AppConfig) -> Option<Arc<FileConversationLog>> {
    if !config.logging.enabled {
        return None;
    }
    match FileConversationLog::new(&config.logging.log_dir) {
        Ok(log) => Some(Arc::new(log)),
        Err(e) => {
            warn!(error = %e, "Conversation logging disabled");
            None
        }
    }
}

impl AppState {
    /// Build the full service graph with the provider chosen from `config`.
    pub async fn bootstrap(config: &AppConfig) -> Result<Self, BootstrapError> {
        let provider = studentdesk_providers::build_from_config(config);
        Self::with_provider(config, provider).await
    }

    /// Build the service graph around an explicit provider.
    pub async fn with_provider(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, BootstrapError> {
        let embedder = build_embedder(config, &provider);
        let store = match &config.knowledge.persist_path {
            Some(path) => InMemoryKnowledgeStore::open(embedder, path.clone()).await?,
            None => InMemoryKnowledgeStore::new(embedder),
        };
        let knowledge = Arc::new(KnowledgeBase::new(
            Arc::new(store),
            config.knowledge.chunk_size,
            config.knowledge.chunk_overlap,
        ));

        if config.knowledge.seed_default_faqs {
            if let Err(e) = knowledge.seed_default_faqs(&config.prompt.locale).await {
                warn!(error = %e, "Could not seed default FAQs");
            }
        }

        let catalog = Catalog::load_or_builtin(config.catalog.data_dir.as_deref());
        let dispatcher: Arc<dyn FunctionDispatcher> = Arc::new(CatalogDispatcher::new(Arc::new(catalog)));

        let idle_ttl = (config.sessions.idle_ttl_secs > 0)
            .then(|| Duration::from_secs(config.sessions.idle_ttl_secs));
        let sessions = Arc::new(SessionStore::new(config.sessions.max_sessions, idle_ttl));

        let log = open_log(config);

        let mut router = ResponseRouter::new(
            Arc::clone(&provider),
            Arc::clone(&dispatcher),
            sessions,
            RouterConfig::from_app_config(config),
        )
        .with_knowledge(knowledge.store());
        if let Some(log) = &log {
            router = router.with_sink(log.clone());
        }

        info!(
            provider = %provider.name(),
            model = %config.provider.model,
            logging = log.is_some(),
            "Services ready"
        );

        Ok(Self {
            router: Arc::new(router),
            knowledge,
            dispatcher,
            provider,
            log,
            cors_origins: config.gateway.cors_origins.clone(),
        })
    }
}

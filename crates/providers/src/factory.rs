//! Provider construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use studentdesk_config::AppConfig;
use studentdesk_core::provider::Provider;
use tracing::{info, warn};

use crate::openai_compat::OpenAiCompatProvider;
use crate::unconfigured::UnconfiguredProvider;

/// Build the generation backend for the configured provider.
///
/// Without an API key the result is an [`UnconfiguredProvider`], which keeps
/// the service answering in demo mode instead of refusing to start.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let provider = &config.provider;
    let base_url = if provider.api_url.trim().is_empty() {
        default_base_url(&provider.name)
    } else {
        provider.api_url.clone()
    };

    match provider.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            info!(provider = %provider.name, model = %provider.model, "Generation backend configured");
            Arc::new(
                OpenAiCompatProvider::new(&provider.name, &base_url, key)
                    .with_timeout(Duration::from_secs(provider.timeout_secs)),
            )
        }
        _ => {
            warn!(provider = %provider.name, "No API key found, running in demo mode");
            Arc::new(UnconfiguredProvider::new(&provider.name))
        }
    }
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
        assert!(default_base_url("something-else").contains("api.openai.com"));
    }

    #[tokio::test]
    async fn missing_key_builds_demo_provider() {
        let config = AppConfig::default();
        let provider = build_from_config(&config);
        assert_eq!(provider.name(), "openai");
        assert!(!provider.health_check().await.unwrap());
    }

    #[test]
    fn key_builds_http_provider() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-test".into());
        config.provider.name = "openrouter".into();
        let provider = build_from_config(&config);
        assert_eq!(provider.name(), "openrouter");
    }
}

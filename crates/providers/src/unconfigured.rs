//! Stand-in provider used when no API key is available.
//!
//! Every call fails with `ProviderError::NotConfigured`, which the router
//! turns into the demo-mode answer.

use async_trait::async_trait;
use studentdesk_core::error::ProviderError;
use studentdesk_core::provider::*;

pub struct UnconfiguredProvider {
    name: String,
}

impl UnconfiguredProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Provider for UnconfiguredProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "no API key configured for provider '{}'",
            self.name
        )))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

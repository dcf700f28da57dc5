//! Provider adapter registry
//!
//! Maps each [`Provider`] to the adapter that owns its models. Read-only after
//! construction and shared across requests behind an `Arc`.

use super::anthropic::AnthropicAdapter;
use super::catalog::{ModelId, Provider};
use super::openai::OpenAiAdapter;
use super::provider::{ProviderAdapter, ProviderError, ProviderResponse};
use crate::config::Config;
use crate::error::AppResult;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.adapters.keys().collect();
        providers.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &providers)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every provider section present in config
    ///
    /// A provider without a config section is left unregistered; queries routed
    /// to it fail with [`ProviderError::NotConfigured`] and take the fallback path.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let mut registry = Self::new();
        let timeout = config.server.request_timeout_seconds;

        if let Some(openai) = config.providers.openai() {
            registry.register(Arc::new(OpenAiAdapter::new(openai, timeout)?));
        }
        if let Some(anthropic) = config.providers.anthropic() {
            registry.register(Arc::new(AnthropicAdapter::new(anthropic, timeout)?));
        }

        for provider in [Provider::OpenAi, Provider::Anthropic] {
            if !registry.contains(provider) {
                tracing::warn!(
                    provider = %provider,
                    "No adapter configured for provider; its models will always use the fallback path"
                );
            }
        }

        Ok(registry)
    }

    /// Register (or replace) the adapter for its provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Adapter owning `model`, if configured
    pub fn adapter_for(&self, model: ModelId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&model.provider())
    }

    /// Run `prompt` against `model` through its owning adapter
    pub async fn query(
        &self,
        prompt: &str,
        model: ModelId,
    ) -> Result<ProviderResponse, ProviderError> {
        match self.adapter_for(model) {
            Some(adapter) => adapter.query(prompt, model).await,
            None => Err(ProviderError::NotConfigured(model.provider())),
        }
    }
}

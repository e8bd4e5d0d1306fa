use super::providers::{
    AnthropicAdapter, DeepSeekAdapter, GeminiAdapter, OpenAiAdapter, ProviderAdapter,
};
use crate::error::UnknownProviderError;
use crate::models::{ProviderKind, HTTP_TIMEOUT_SECS};
use crate::settings::Settings;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maps provider names to adapters. All built-in adapters share one HTTP client.
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        // Building only fails when the TLS backend cannot initialise
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                Client::new()
            });
        Self::with_client(client)
    }

    /// Registry using the request timeout from the settings file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_timeout(Duration::from_secs(settings.http_timeout_secs))
    }

    pub fn with_client(client: Client) -> Self {
        let mut adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(ProviderKind::Anthropic, Arc::new(AnthropicAdapter::new(client.clone())));
        adapters.insert(ProviderKind::Gemini, Arc::new(GeminiAdapter::new(client.clone())));
        adapters.insert(ProviderKind::Deepseek, Arc::new(DeepSeekAdapter::new(client.clone())));
        adapters.insert(ProviderKind::Openai, Arc::new(OpenAiAdapter::new(client)));
        Self { adapters }
    }

    /// Replace the adapter serving `kind`.
    pub fn register(&mut self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ProviderAdapter>, UnknownProviderError> {
        let kind: ProviderKind = name.parse()?;
        self.resolve_kind(kind)
    }

    pub fn resolve_kind(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>, UnknownProviderError> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| UnknownProviderError(kind.id().to_string()))
    }

    pub fn default_model(&self, kind: ProviderKind) -> Option<&'static str> {
        self.adapters.get(&kind).map(|adapter| adapter.default_model())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

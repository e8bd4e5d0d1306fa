// Provider adapters - one per AI vendor, all behind `ProviderAdapter`
pub mod anthropic;
pub mod deepseek;
pub mod gemini;
pub mod openai;

use crate::error::ApiError;
use crate::models::{BlenderContextSnapshot, ChatMessage, ProviderConfig, ProviderKind};
use async_trait::async_trait;

pub use anthropic::AnthropicAdapter;
pub use deepseek::DeepSeekAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

/// Translation layer between the normalized chat protocol and one vendor's API.
///
/// `send` performs exactly one network call and never retries; classifying the
/// failure is the adapter's job, deciding what to do about it is the caller's.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn default_model(&self) -> &'static str;

    fn models(&self) -> &'static [&'static str];

    /// Local format check of a key, no network involved.
    fn validate_api_key(&self, api_key: &str) -> Result<(), ApiError> {
        check_key_shape(self.kind(), api_key, None)
    }

    /// Local check, then one authenticated request to the vendor. Adapters
    /// without a cheap endpoint stop at the local check.
    async fn verify_api_key(&self, config: &ProviderConfig) -> Result<(), ApiError> {
        self.validate_api_key(&config.api_key)
    }

    async fn send(
        &self,
        history: &[ChatMessage],
        context: &BlenderContextSnapshot,
        config: &ProviderConfig,
    ) -> Result<ChatMessage, ApiError>;
}

pub(crate) fn check_key_shape(
    kind: ProviderKind,
    api_key: &str,
    required_prefix: Option<&str>,
) -> Result<(), ApiError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::auth(format!(
            "No API key provided for {}. Please set your API key in the addon preferences.",
            kind.display_name()
        )));
    }
    if api_key.len() < 10 {
        return Err(ApiError::auth("API key appears to be invalid"));
    }
    if let Some(prefix) = required_prefix {
        if !api_key.starts_with(prefix) {
            return Err(ApiError::auth(format!(
                "{} API keys should start with '{}'",
                kind.display_name(),
                prefix
            )));
        }
    }
    Ok(())
}

/// Preconditions shared by every adapter, checked before any I/O.
pub(crate) fn check_request(
    kind: ProviderKind,
    history: &[ChatMessage],
    config: &ProviderConfig,
) -> Result<(), ApiError> {
    if history.is_empty() {
        return Err(ApiError::invalid_request("Conversation history is empty"));
    }
    if !history.iter().any(|message| message.is_user()) {
        return Err(ApiError::invalid_request("Conversation has no user message"));
    }
    if config.api_key.trim().is_empty() {
        return Err(ApiError::auth(format!(
            "No API key provided for {}. Please set your API key in the addon preferences.",
            kind.display_name()
        )));
    }
    Ok(())
}

pub(crate) fn resolve_model(config: &ProviderConfig, default_model: &str) -> String {
    if config.model.trim().is_empty() {
        default_model.to_string()
    } else {
        config.model.clone()
    }
}

use super::openai::{chat_completions, list_models_check};
use super::{check_key_shape, check_request, resolve_model, ProviderAdapter};
use crate::chat::helpers::convert_model_name;
use crate::error::ApiError;
use crate::models::{BlenderContextSnapshot, ChatMessage, ProviderConfig, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;

// DeepSeek speaks the OpenAI chat-completions dialect
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const PROVIDER: &str = "DeepSeek";

const MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];

pub struct DeepSeekAdapter {
    client: Client,
}

impl DeepSeekAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for DeepSeekAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deepseek
    }

    fn default_model(&self) -> &'static str {
        MODELS[0]
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn validate_api_key(&self, api_key: &str) -> Result<(), ApiError> {
        check_key_shape(self.kind(), api_key, Some("sk-"))
    }

    async fn verify_api_key(&self, config: &ProviderConfig) -> Result<(), ApiError> {
        self.validate_api_key(&config.api_key)?;
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        list_models_check(&self.client, PROVIDER, base, &config.api_key).await
    }

    async fn send(
        &self,
        history: &[ChatMessage],
        context: &BlenderContextSnapshot,
        config: &ProviderConfig,
    ) -> Result<ChatMessage, ApiError> {
        check_request(self.kind(), history, config)?;
        let model = convert_model_name(&resolve_model(config, self.default_model()), "deepseek");
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        chat_completions(&self.client, PROVIDER, base, &config.api_key, &model, history, context).await
    }
}

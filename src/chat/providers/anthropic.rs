use super::{check_key_shape, check_request, resolve_model, ProviderAdapter};
use crate::chat::helpers::*;
use crate::error::ApiError;
use crate::models::{
    BlenderContextSnapshot, ChatMessage, ChatRole, ProviderConfig, ProviderKind,
    ANTHROPIC_VERSION, CHAT_TEMPERATURE, DEFAULT_MAX_TOKENS,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const PROVIDER: &str = "Anthropic";

const MODELS: &[&str] = &[
    "claude-3-7-sonnet-latest",
    "claude-3-5-sonnet-latest",
    "claude-3-5-haiku-latest",
];

pub struct AnthropicAdapter {
    client: Client,
}

impl AnthropicAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

pub fn request_body(
    model: &str,
    history: &[ChatMessage],
    context: &BlenderContextSnapshot,
) -> Value {
    let messages: Vec<Value> = turn_texts(history, context)
        .into_iter()
        .map(|(message, text)| {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            serde_json::json!({
                "role": role,
                "content": [{ "type": "text", "text": text }]
            })
        })
        .collect();

    serde_json::json!({
        "model": model,
        "system": SYSTEM_PROMPT,
        "messages": messages,
        "max_tokens": DEFAULT_MAX_TOKENS,
        "temperature": CHAT_TEMPERATURE,
    })
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_model(&self) -> &'static str {
        MODELS[0]
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn validate_api_key(&self, api_key: &str) -> Result<(), ApiError> {
        check_key_shape(self.kind(), api_key, Some("sk-ant-"))
    }

    async fn verify_api_key(&self, config: &ProviderConfig) -> Result<(), ApiError> {
        self.validate_api_key(&config.api_key)?;
        let base = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        let request = self
            .client
            .get(format!("{}/models", base))
            .header("x-api-key", config.api_key.trim())
            .header("anthropic-version", ANTHROPIC_VERSION);
        check_key_online(PROVIDER, request).await
    }

    async fn send(
        &self,
        history: &[ChatMessage],
        context: &BlenderContextSnapshot,
        config: &ProviderConfig,
    ) -> Result<ChatMessage, ApiError> {
        check_request(self.kind(), history, config)?;
        let model = convert_model_name(&resolve_model(config, self.default_model()), "anthropic");
        let base = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        let endpoint = format!("{}/messages", base);
        let body = request_body(&model, history, context);

        tracing::debug!(provider = PROVIDER, %model, turns = history.len(), "sending chat request");
        let resp = self
            .client
            .post(endpoint)
            .header("x-api-key", config.api_key.trim())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(PROVIDER, e))?;
        let text = read_reply(PROVIDER, resp, extract_anthropic_message).await?;
        Ok(ChatMessage::assistant(text))
    }
}

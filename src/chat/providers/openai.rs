use super::{check_key_shape, check_request, resolve_model, ProviderAdapter};
use crate::chat::helpers::*;
use crate::error::ApiError;
use crate::models::{
    BlenderContextSnapshot, ChatMessage, ChatRole, ProviderConfig, ProviderKind,
    CHAT_TEMPERATURE, DEFAULT_MAX_TOKENS,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "OpenAI";

const MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o"];

pub struct OpenAiAdapter {
    client: Client,
}

impl OpenAiAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Chat-completions body, shared with every OpenAI-compatible vendor.
pub fn request_body(
    model: &str,
    history: &[ChatMessage],
    context: &BlenderContextSnapshot,
) -> Value {
    let mut messages = vec![serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT })];
    messages.extend(turn_texts(history, context).into_iter().map(|(message, text)| {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        serde_json::json!({ "role": role, "content": text })
    }));

    serde_json::json!({
        "model": model,
        "messages": messages,
        "temperature": CHAT_TEMPERATURE,
        "max_tokens": DEFAULT_MAX_TOKENS,
    })
}

/// One chat-completions round trip against `base`.
pub(crate) async fn chat_completions(
    client: &Client,
    provider: &'static str,
    base: &str,
    api_key: &str,
    model: &str,
    history: &[ChatMessage],
    context: &BlenderContextSnapshot,
) -> Result<ChatMessage, ApiError> {
    let endpoint = format!("{}/chat/completions", normalize_base_url(base));
    let body = request_body(model, history, context);

    tracing::debug!(provider, %model, turns = history.len(), "sending chat request");
    let resp = client
        .post(endpoint)
        .bearer_auth(api_key.trim())
        .json(&body)
        .send()
        .await
        .map_err(|e| classify_transport_error(provider, e))?;
    let text = read_reply(provider, resp, extract_openai_message).await?;
    Ok(ChatMessage::assistant(text))
}

/// `GET /models` with bearer auth, shared with OpenAI-compatible vendors.
pub(crate) async fn list_models_check(
    client: &Client,
    provider: &'static str,
    base: &str,
    api_key: &str,
) -> Result<(), ApiError> {
    let request = client
        .get(format!("{}/models", normalize_base_url(base)))
        .bearer_auth(api_key.trim());
    check_key_online(provider, request).await
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openai
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
        let model = convert_model_name(&resolve_model(config, self.default_model()), "openai");
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        chat_completions(&self.client, PROVIDER, base, &config.api_key, &model, history, context).await
    }
}

use super::{check_request, resolve_model, ProviderAdapter};
use crate::chat::helpers::*;
use crate::error::ApiError;
use crate::models::{
    BlenderContextSnapshot, ChatMessage, ChatRole, ProviderConfig, ProviderKind,
    GEMINI_MAX_OUTPUT_TOKENS, GEMINI_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "Google Gemini";
// Kept out of the query string so the key never shows up in URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

const MODELS: &[&str] = &["gemini-2.0-flash-001", "gemini-2.0-pro-exp-02-05"];

pub struct GeminiAdapter {
    client: Client,
}

impl GeminiAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

pub fn request_body(history: &[ChatMessage], context: &BlenderContextSnapshot) -> Value {
    let contents: Vec<Value> = turn_texts(history, context)
        .into_iter()
        .map(|(message, text)| {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            serde_json::json!({ "role": role, "parts": [{ "text": text }] })
        })
        .collect();

    serde_json::json!({
        "contents": contents,
        "systemInstruction": {
            "role": "system",
            "parts": [{ "text": SYSTEM_PROMPT }]
        },
        "generationConfig": {
            "temperature": GEMINI_TEMPERATURE,
            "topP": 0.95,
            "topK": 40,
            "maxOutputTokens": GEMINI_MAX_OUTPUT_TOKENS
        }
    })
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn default_model(&self) -> &'static str {
        MODELS[0]
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    async fn verify_api_key(&self, config: &ProviderConfig) -> Result<(), ApiError> {
        self.validate_api_key(&config.api_key)?;
        let base = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        let request = self
            .client
            .get(format!("{}/models", base))
            .header(API_KEY_HEADER, config.api_key.trim());
        check_key_online(PROVIDER, request).await
    }

    async fn send(
        &self,
        history: &[ChatMessage],
        context: &BlenderContextSnapshot,
        config: &ProviderConfig,
    ) -> Result<ChatMessage, ApiError> {
        check_request(self.kind(), history, config)?;
        let model = convert_model_name(&resolve_model(config, self.default_model()), "google");
        let base = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base,
            urlencoding::encode(&model)
        );
        let body = request_body(history, context);

        tracing::debug!(provider = PROVIDER, %model, turns = history.len(), "sending chat request");
        let resp = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, config.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(PROVIDER, e))?;
        let text = read_reply(PROVIDER, resp, extract_gemini_message).await?;
        Ok(ChatMessage::assistant(text))
    }
}

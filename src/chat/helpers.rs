use crate::error::{ApiError, ApiErrorKind};
use crate::models::{BlenderContextSnapshot, ChatMessage, KEY_CHECK_TIMEOUT_SECS};
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;

pub const SYSTEM_PROMPT: &str = "You are Kitsune, an AI assistant specialized in helping users with 3D modeling in Blender.
Your primary goal is to generate Python code using Blender's Python API (bpy) to help users create and modify 3D models.

When the user asks you to create or modify 3D models:
1. Generate working Python code that accomplishes the user's request
2. Surround your code with triple backticks (```)
3. Explain briefly what the code does
4. Keep explanations concise - users primarily need working code

Some important guidelines:
- Use `bpy.context.selected_objects` to work with what the user has selected
- Respect the current edit mode the user is in
- Provide code that works with Blender 3.0 or later
- Make your code robust with error checking where appropriate
- Assume your code will be executed in the main Blender Python context

IMPORTANT: When given information about the current scene, use it to tailor your code to the user's specific context.";

pub fn normalize_prompt(prompt: &str) -> String {
    prompt.trim().to_string()
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Strip the `vendor/` prefix and `:free` suffix stored by older addon preferences.
pub fn convert_model_name(model: &str, vendor_prefix: &str) -> String {
    let model = model.trim();
    let model = model
        .strip_prefix(vendor_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model);
    model.strip_suffix(":free").unwrap_or(model).to_string()
}

/// Wrap the newest user turn with the scene snapshot.
pub fn build_user_turn(prompt: &str, context: &BlenderContextSnapshot) -> String {
    format!(
        "Here's information about my current Blender scene:\n{}\n\nMy request: {}\n\nPlease respond with Python code that I can run in Blender to accomplish this.",
        context.to_prompt_json(),
        prompt
    )
}

/// Text for each turn as sent to the provider; the last user turn carries context.
///
/// Assistant turns left at the front by history trimming are skipped, since
/// vendors expect the conversation to open with a user turn.
pub fn turn_texts<'a>(
    history: &'a [ChatMessage],
    context: &BlenderContextSnapshot,
) -> Vec<(&'a ChatMessage, String)> {
    let last_user = history.iter().rposition(|message| message.is_user());
    history
        .iter()
        .enumerate()
        .skip_while(|(_, message)| !message.is_user())
        .map(|(index, message)| {
            let text = if Some(index) == last_user {
                build_user_turn(&message.text, context)
            } else {
                message.text.clone()
            };
            (message, text)
        })
        .collect()
}

pub fn extract_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(|text| text.to_string())
}

pub fn extract_openai_message(json: &Value) -> Option<String> {
    json.get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(extract_text)
}

pub fn extract_anthropic_message(json: &Value) -> Option<String> {
    json.get("content")
        .and_then(|content| content.as_array())
        .and_then(|content| {
            content
                .iter()
                .find(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
        })
        .and_then(|part| part.get("text"))
        .and_then(extract_text)
}

pub fn extract_gemini_message(json: &Value) -> Option<String> {
    json.get("candidates")
        .and_then(|candidates| candidates.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(extract_text)
}

/// Pull `error.message` (or a bare `error` string) out of a provider error body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    error
        .get("message")
        .and_then(|message| message.as_str())
        .or_else(|| error.as_str())
        .map(|message| message.to_string())
}

fn looks_like_auth_failure(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("api_key_invalid")
        || lowered.contains("invalid api key")
        || lowered.contains("invalid x-api-key")
        || lowered.contains("incorrect api key")
        || lowered.contains("authentication_error")
}

/// Classify a non-success HTTP answer into the error taxonomy.
pub fn classify_http_error(provider: &str, status: u16, body: &str) -> ApiError {
    let detail = extract_error_message(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {} - {}", status, truncate(trimmed, 200))
        }
    });
    let message = format!("{} API error: {}", provider, detail);

    let kind = match status {
        401 | 403 => ApiErrorKind::AuthError,
        429 => ApiErrorKind::RateLimited,
        408 | 500..=599 => ApiErrorKind::NetworkError,
        _ if looks_like_auth_failure(body) => ApiErrorKind::AuthError,
        _ => ApiErrorKind::InvalidRequest,
    };
    ApiError::new(kind, message)
}

pub fn classify_transport_error(provider: &str, err: reqwest::Error) -> ApiError {
    // Request URLs can carry credentials in the query string
    let err = err.without_url();
    if err.is_timeout() {
        ApiError::network(format!(
            "Request to {} API timed out. Please try again.",
            provider
        ))
    } else if err.is_decode() {
        ApiError::malformed(format!("{} response could not be decoded: {}", provider, err))
    } else {
        ApiError::network(format!("Error communicating with {} API: {}", provider, err))
    }
}

/// Shared response handling: status check, JSON parse, text extraction.
pub async fn read_reply(
    provider: &str,
    resp: reqwest::Response,
    extract: fn(&Value) -> Option<String>,
) -> Result<String, ApiError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| classify_transport_error(provider, e))?;
    if !status.is_success() {
        let err = classify_http_error(provider, status.as_u16(), &text);
        tracing::warn!(provider, status = status.as_u16(), kind = %err.kind, "provider returned an error");
        return Err(err);
    }
    let json: Value = serde_json::from_str(&text).map_err(|e| {
        ApiError::malformed(format!("{} response is not valid JSON: {}", provider, e))
    })?;
    extract(&json).ok_or_else(|| {
        ApiError::malformed(format!("Unexpected response structure from {} API", provider))
    })
}

/// Authenticated request whose only purpose is to prove the key works.
pub async fn check_key_online(provider: &str, request: RequestBuilder) -> Result<(), ApiError> {
    let resp = request
        .timeout(Duration::from_secs(KEY_CHECK_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| classify_transport_error(provider, e))?;
    let status = resp.status();
    if status.is_success() {
        tracing::debug!(provider, "API key accepted");
        return Ok(());
    }
    if status.as_u16() == 401 {
        return Err(ApiError::auth("Invalid API key: Authentication failed"));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_http_error(provider, status.as_u16(), &body))
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_model_name_strips_vendor_prefix_and_free_suffix() {
        assert_eq!(convert_model_name("google/gemini-2.0-flash-001", "google"), "gemini-2.0-flash-001");
        assert_eq!(convert_model_name("deepseek/deepseek-r1:free", "deepseek"), "deepseek-r1");
        assert_eq!(convert_model_name("gpt-4o-mini", "openai"), "gpt-4o-mini");
        // A different vendor's prefix is left alone
        assert_eq!(convert_model_name("openai/gpt-4o", "deepseek"), "openai/gpt-4o");
    }

    #[test]
    fn test_anthropic_reply_skips_non_text_parts() {
        let body = json!({
            "content": [
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "Here you go" }
            ]
        });
        assert_eq!(extract_anthropic_message(&body).as_deref(), Some("Here you go"));
    }

    #[test]
    fn test_empty_content_counts_as_missing() {
        let body = json!({ "choices": [{ "message": { "content": "   " } }] });
        assert_eq!(extract_openai_message(&body), None);
    }

    #[test]
    fn test_classify_http_error_statuses() {
        assert_eq!(classify_http_error("OpenAI", 401, "").kind, ApiErrorKind::AuthError);
        assert_eq!(classify_http_error("OpenAI", 429, "").kind, ApiErrorKind::RateLimited);
        assert_eq!(classify_http_error("OpenAI", 503, "").kind, ApiErrorKind::NetworkError);
        assert_eq!(classify_http_error("OpenAI", 404, "").kind, ApiErrorKind::InvalidRequest);
    }

    #[test]
    fn test_gemini_bad_key_is_auth_error_despite_400() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        let err = classify_http_error("Google Gemini", 400, body);
        assert_eq!(err.kind, ApiErrorKind::AuthError);
        assert_eq!(err.message, "Google Gemini API error: API key not valid.");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        let err = classify_http_error("DeepSeek", 500, "upstream exploded");
        assert_eq!(err.message, "DeepSeek API error: HTTP 500 - upstream exploded");
    }

    #[test]
    fn test_last_user_turn_carries_context() {
        let history = vec![
            ChatMessage::user("make a cube"),
            ChatMessage::assistant("```python\nbpy.ops.mesh.primitive_cube_add()\n```"),
            ChatMessage::user("now scale it"),
        ];
        let context = BlenderContextSnapshot::default();
        let turns = turn_texts(&history, &context);
        assert_eq!(turns[0].1, "make a cube");
        assert!(turns[2].1.contains("My request: now scale it"));
        assert!(turns[2].1.contains("\"mode\": \"OBJECT\""));
    }

    #[test]
    fn test_leading_assistant_turns_are_skipped() {
        let history = vec![
            ChatMessage::assistant("left over from a trimmed exchange"),
            ChatMessage::user("add a sphere"),
        ];
        let turns = turn_texts(&history, &BlenderContextSnapshot::default());
        assert_eq!(turns.len(), 1);
        assert!(turns[0].0.is_user());
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghijkl", 6), "abc...");
    }
}

use crate::chat::session::ChatSession;
use crate::error::ConfigError;
use crate::models::ChatRole;
use crate::settings::atomic_write;
use serde::Serialize;
use std::path::Path;

/// Schema version for exported JSON transcripts
pub const TRANSCRIPT_VERSION: &str = "1";

#[derive(Serialize)]
struct TranscriptFile<'a> {
    version: &'a str,
    exported_at: String,
    provider: String,
    model: &'a str,
    #[serde(flatten)]
    session: &'a ChatSession,
}

pub fn to_markdown(session: &ChatSession) -> String {
    let mut out = format!("# {}\n\n", session.title());
    out.push_str(&format!(
        "_Provider: {} ({})_\n",
        session.config().provider.display_name(),
        session.config().model
    ));
    for message in session.history() {
        let speaker = match message.role {
            ChatRole::User => "You",
            ChatRole::Assistant => "Kitsune",
        };
        out.push_str(&format!(
            "\n## {} - {}\n\n{}\n",
            speaker,
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.text.trim_end()
        ));
    }
    out
}

pub fn to_json(session: &ChatSession) -> Result<String, ConfigError> {
    let file = TranscriptFile {
        version: TRANSCRIPT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        provider: session.config().provider.id().to_string(),
        model: &session.config().model,
        session,
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Write the transcript to `path`; `.json` gets JSON, anything else Markdown.
pub fn export(session: &ChatSession, path: &Path) -> Result<(), ConfigError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let content = if is_json {
        to_json(session)?
    } else {
        to_markdown(session)
    };
    atomic_write(path, content.as_bytes())?;
    tracing::info!(
        path = %path.display(),
        messages = session.history().len(),
        "exported chat transcript"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, ProviderConfig, ProviderKind};

    fn session() -> ChatSession {
        let mut session = ChatSession::new(ProviderConfig::new(
            ProviderKind::Openai,
            "sk-secret-0123456789",
            "gpt-4o-mini",
        ));
        session.rename("Cube test");
        session.push(ChatMessage::user("Create a cube"));
        session.push(ChatMessage::assistant(
            "```python\nbpy.ops.mesh.primitive_cube_add()\n```",
        ));
        session
    }

    #[test]
    fn test_markdown_lists_turns_in_order() {
        let markdown = to_markdown(&session());
        assert!(markdown.starts_with("# Cube test\n"));
        assert!(markdown.contains("_Provider: OpenAI (gpt-4o-mini)_"));
        let you = markdown.find("## You").unwrap();
        let kitsune = markdown.find("## Kitsune").unwrap();
        assert!(you < kitsune);
    }

    #[test]
    fn test_json_never_contains_api_key() {
        let json = to_json(&session()).unwrap();
        assert!(!json.contains("sk-secret"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["provider"], "openai");
        assert_eq!(value["title"], "Cube test");
        assert_eq!(value["history"].as_array().unwrap().len(), 2);
        assert_eq!(value["history"][0]["role"], "user");
    }
}

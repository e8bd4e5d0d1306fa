use crate::models::{ChatMessage, GeneratedCode};
use regex::Regex;
use std::sync::OnceLock;

// Opening fence, an optional language tag line, then everything up to the next fence
fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(?:[A-Za-z0-9_+.-]*[ \t]*\r?\n)?(.*?)```").expect("fence pattern is valid")
    })
}

/// Source of the first fenced block in `text`, trimmed. Empty blocks count as none.
pub fn extract_source(text: &str) -> Option<String> {
    let captures = fence_pattern().captures(text)?;
    let source = captures.get(1)?.as_str().trim();
    if source.is_empty() {
        None
    } else {
        Some(source.to_string())
    }
}

/// Isolate the script in an assistant reply.
pub fn extract(message: &ChatMessage) -> Option<GeneratedCode> {
    extract_source(&message.text).map(|source_text| GeneratedCode {
        source_text,
        extracted_from: message.id,
    })
}

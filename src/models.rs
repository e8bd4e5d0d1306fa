use crate::error::UnknownProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// Network and generation constants
pub const HTTP_TIMEOUT_SECS: u64 = 60;
pub const KEY_CHECK_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const GEMINI_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const CHAT_TEMPERATURE: f32 = 0.3;
pub const GEMINI_TEMPERATURE: f32 = 0.2;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// History limits
pub const DEFAULT_MAX_CONVERSATION_LENGTH: u16 = 20;
pub const MAX_CONVERSATION_LENGTH_LIMIT: u16 = 100;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn in the conversation. Never modified after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, text)
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// Script isolated from an assistant reply, ready for preview or execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub source_text: String,
    pub extracted_from: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Gemini,
    Deepseek,
    Openai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Deepseek,
        ProviderKind::Openai,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Deepseek => "deepseek",
            ProviderKind::Openai => "openai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::Deepseek => "DeepSeek",
            ProviderKind::Openai => "OpenAI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProviderError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::Deepseek),
            "openai" => Ok(ProviderKind::Openai),
            _ => Err(UnknownProviderError(name.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

// Keep the key out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectedObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub dimensions: [f64; 3],
    pub location: [f64; 3],
    // Only present for MESH objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygons: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActiveObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneInfo {
    pub name: String,
    pub objects_count: u32,
    pub render_engine: String,
}

/// Point-in-time capture of the host scene, embedded in each request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlenderContextSnapshot {
    pub mode: String,
    #[serde(default)]
    pub selected_objects: Vec<SelectedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_object: Option<ActiveObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneInfo>,
}

impl Default for BlenderContextSnapshot {
    fn default() -> Self {
        Self {
            mode: "OBJECT".to_string(),
            selected_objects: Vec::new(),
            active_object: None,
            scene: None,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

impl BlenderContextSnapshot {
    /// JSON rendering used inside prompts; coordinates rounded to 4 places.
    pub fn to_prompt_json(&self) -> String {
        let mut rounded = self.clone();
        for object in &mut rounded.selected_objects {
            object.dimensions = object.dimensions.map(round4);
            object.location = object.location.map(round4);
        }
        serde_json::to_string_pretty(&rounded).unwrap_or_else(|_| "{}".to_string())
    }
}

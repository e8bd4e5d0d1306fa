use crate::models::{
    ChatMessage, ProviderConfig, DEFAULT_MAX_CONVERSATION_LENGTH, MAX_CONVERSATION_LENGTH_LIMIT,
};
use serde::Serialize;

pub fn clamp_max_conversation_length(value: u16) -> u16 {
    value.min(MAX_CONVERSATION_LENGTH_LIMIT)
}

/// Conversation state for one chat panel.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    title: String,
    history: Vec<ChatMessage>,
    #[serde(skip)]
    config: ProviderConfig,
    /// 0 keeps everything
    #[serde(skip)]
    max_length: u16,
}

impl ChatSession {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            title: "Kitsune Chat".to_string(),
            history: Vec::new(),
            config,
            max_length: DEFAULT_MAX_CONVERSATION_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: u16) -> Self {
        self.set_max_length(max_length);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rename(&mut self, title: &str) {
        let title = title.trim();
        if !title.is_empty() {
            self.title = title.to_string();
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn max_length(&self) -> u16 {
        self.max_length
    }

    pub fn set_max_length(&mut self, max_length: u16) {
        self.max_length = clamp_max_conversation_length(max_length);
        self.enforce_limit();
    }

    /// Make `config` the active provider. History is left as it is.
    /// Returns whether anything changed.
    pub fn switch_provider(&mut self, config: ProviderConfig) -> bool {
        if self.config == config {
            return false;
        }
        tracing::info!(
            from = %self.config.provider,
            to = %config.provider,
            model = %config.model,
            "switching provider"
        );
        self.config = config;
        true
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        self.enforce_limit();
    }

    pub fn contains(&self, id: uuid::Uuid) -> bool {
        self.history.iter().any(|message| message.id == id)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn enforce_limit(&mut self) {
        let max = self.max_length as usize;
        if max > 0 && self.history.len() > max {
            let excess = self.history.len() - max;
            self.history.drain(..excess);
            tracing::debug!(dropped = excess, "trimmed conversation history");
        }
    }
}

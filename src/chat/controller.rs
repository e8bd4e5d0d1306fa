use super::extract::extract;
use super::helpers::normalize_prompt;
use super::registry::ProviderRegistry;
use super::session::ChatSession;
use crate::bridge::ExecutionBridge;
use crate::error::{ChatError, ConfigError};
use crate::host::Host;
use crate::models::{ChatMessage, GeneratedCode, ProviderConfig};
use crate::utils::mutex::{safe_lock, safe_lock_or_recover};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const STATE_LOCK: &str = "Failed to lock chat session";

struct ControllerState {
    session: ChatSession,
    /// Ticket of the submission currently waiting on a provider
    in_flight: Option<u64>,
    next_ticket: u64,
    pending_code: Option<GeneratedCode>,
}

/// Owns the chat session and drives prompts through the selected provider.
///
/// The state lock is never held across an `.await`; the in-flight ticket is
/// what keeps a second submission out while a request is outstanding.
pub struct ChatController {
    host: Arc<dyn Host>,
    registry: ProviderRegistry,
    state: Mutex<ControllerState>,
}

/// Releases the in-flight ticket if `submit` is dropped mid-request.
struct InFlightGuard<'a> {
    state: &'a Mutex<ControllerState>,
    ticket: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = safe_lock_or_recover(self.state);
        if state.in_flight == Some(self.ticket) {
            state.in_flight = None;
        }
    }
}

fn config_error(err: ConfigError) -> ChatError {
    match err {
        ConfigError::UnknownProvider(unknown) => ChatError::UnknownProvider(unknown),
        other => ChatError::Config(other),
    }
}

impl ChatController {
    pub fn new(host: Arc<dyn Host>, registry: ProviderRegistry) -> Result<Self, ChatError> {
        let config = host.preferences().map_err(config_error)?;
        Ok(Self::with_config(host, registry, config))
    }

    pub fn with_config(host: Arc<dyn Host>, registry: ProviderRegistry, config: ProviderConfig) -> Self {
        Self {
            host,
            registry,
            state: Mutex::new(ControllerState {
                session: ChatSession::new(config),
                in_flight: None,
                next_ticket: 1,
                pending_code: None,
            }),
        }
    }

    pub fn set_max_conversation_length(&self, max_length: u16) -> Result<(), ChatError> {
        safe_lock(&self.state, STATE_LOCK)?
            .session
            .set_max_length(max_length);
        Ok(())
    }

    /// Send `prompt` to the active provider and return the script in its reply.
    ///
    /// The user message is recorded before the call and stays recorded whatever
    /// happens next. The assistant reply is only recorded when the call succeeds
    /// and was not cancelled in the meantime.
    pub async fn submit(&self, prompt: &str) -> Result<GeneratedCode, ChatError> {
        let prompt = normalize_prompt(prompt);
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        if self.is_in_flight() {
            return Err(ChatError::Busy);
        }
        let config = self.host.preferences().map_err(config_error)?;
        let adapter = self.registry.resolve_kind(config.provider)?;

        let (ticket, history, config) = {
            let mut state = safe_lock(&self.state, STATE_LOCK)?;
            // Re-checked under the lock; another submit may have started meanwhile
            if state.in_flight.is_some() {
                return Err(ChatError::Busy);
            }
            state.session.switch_provider(config);
            state.session.push(ChatMessage::user(prompt));
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.in_flight = Some(ticket);
            state.pending_code = None;
            (
                ticket,
                state.session.history().to_vec(),
                state.session.config().clone(),
            )
        };
        let _guard = InFlightGuard {
            state: &self.state,
            ticket,
        };

        let context = self.host.context();
        tracing::info!(
            ticket,
            provider = %config.provider,
            model = %config.model,
            turns = history.len(),
            "submitting prompt"
        );
        let result = adapter.send(&history, &context, &config).await;

        let mut state = safe_lock(&self.state, STATE_LOCK)?;
        if state.in_flight != Some(ticket) {
            tracing::info!(ticket, "ignoring reply for cancelled request");
            return Err(ChatError::Cancelled);
        }
        state.in_flight = None;

        let reply = result.map_err(|err| {
            tracing::warn!(ticket, kind = %err.kind, error = %err.message, "provider request failed");
            ChatError::Api(err)
        })?;
        state.session.push(reply.clone());

        match extract(&reply) {
            Some(code) => {
                tracing::debug!(ticket, lines = code.source_text.lines().count(), "extracted code");
                state.pending_code = Some(code.clone());
                Ok(code)
            }
            None => {
                tracing::info!(ticket, "reply contained no executable code");
                Err(ChatError::NoCode)
            }
        }
    }

    /// Void the outstanding request; a late reply will be dropped.
    pub fn cancel(&self) -> bool {
        let mut state = safe_lock_or_recover(&self.state);
        match state.in_flight.take() {
            Some(ticket) => {
                tracing::info!(ticket, "request cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        safe_lock_or_recover(&self.state).in_flight.is_some()
    }

    pub fn history(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(safe_lock(&self.state, STATE_LOCK)?.session.history().to_vec())
    }

    pub fn session(&self) -> Result<ChatSession, ChatError> {
        Ok(safe_lock(&self.state, STATE_LOCK)?.session.clone())
    }

    pub fn pending_code(&self) -> Option<GeneratedCode> {
        safe_lock_or_recover(&self.state).pending_code.clone()
    }

    /// Load the script from an earlier assistant message for preview.
    pub fn preview(&self, message_id: Uuid) -> Result<GeneratedCode, ChatError> {
        let mut state = safe_lock(&self.state, STATE_LOCK)?;
        let code = state
            .session
            .history()
            .iter()
            .find(|message| message.id == message_id && !message.is_user())
            .and_then(extract)
            .ok_or(ChatError::NoCode)?;
        state.pending_code = Some(code.clone());
        Ok(code)
    }

    pub fn discard_pending(&self) {
        if safe_lock_or_recover(&self.state).pending_code.take().is_some() {
            tracing::info!("code execution cancelled");
        }
    }

    /// Run the pending script in the host. It stays pending if the host
    /// reports an error so the user can inspect it.
    pub fn execute_pending(&self) -> Result<(), ChatError> {
        let code = self.pending_code().ok_or(ChatError::NoPendingCode)?;
        ExecutionBridge::new(self.host.as_ref()).execute(&code)?;

        let mut state = safe_lock(&self.state, STATE_LOCK)?;
        if state.pending_code.as_ref() == Some(&code) {
            state.pending_code = None;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ChatError> {
        let mut state = safe_lock(&self.state, STATE_LOCK)?;
        state.session.clear();
        state.pending_code = None;
        tracing::info!("conversation cleared");
        Ok(())
    }

    pub fn rename(&self, title: &str) -> Result<(), ChatError> {
        safe_lock(&self.state, STATE_LOCK)?.session.rename(title);
        Ok(())
    }
}

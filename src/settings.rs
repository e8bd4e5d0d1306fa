use crate::chat::session::clamp_max_conversation_length;
use crate::error::ConfigError;
use crate::models::{
    ProviderConfig, ProviderKind, DEFAULT_MAX_CONVERSATION_LENGTH, HTTP_TIMEOUT_SECS,
};
use crate::utils::mutex::safe_lock_or_recover;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CONFIG_PATH_ENV: &str = "KITSUNE_CONFIG";

pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(shellexpand::tilde(path.trim()).into_owned()));
        }
    }
    std::env::var("HOME")
        .ok()
        .map(|home| Path::new(&home).join(".config/kitsune/settings.json"))
}

fn default_provider() -> String {
    ProviderKind::Anthropic.id().to_string()
}
fn default_max_conversation_length() -> u16 {
    DEFAULT_MAX_CONVERSATION_LENGTH
}
fn default_true() -> bool {
    true
}
fn default_http_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECS
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Plain-text fallback for hosts without a keychain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    #[serde(default = "default_max_conversation_length")]
    pub max_conversation_length: u16,
    #[serde(default = "default_true")]
    pub confirm_code_execution: bool,
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_conversation_length: default_max_conversation_length(),
            confirm_code_execution: true,
            debug_mode: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let providers = [
            (ProviderKind::Anthropic, "claude-3-7-sonnet-latest"),
            (ProviderKind::Gemini, "gemini-2.0-flash-001"),
            (ProviderKind::Deepseek, "deepseek-chat"),
            (ProviderKind::Openai, "gpt-4o-mini"),
        ]
        .into_iter()
        .map(|(kind, model)| {
            (
                kind.id().to_string(),
                ProviderSettings {
                    model: model.to_string(),
                    ..ProviderSettings::default()
                },
            )
        })
        .collect();
        Self {
            provider: default_provider(),
            providers,
            chat: ChatSettings::default(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn active_provider(&self) -> Result<ProviderKind, ConfigError> {
        Ok(self.provider.parse()?)
    }

    pub fn provider_settings(&self, kind: ProviderKind) -> ProviderSettings {
        self.providers.get(kind.id()).cloned().unwrap_or_default()
    }

    /// Build the config for the active provider around an already resolved key.
    pub fn provider_config(&self, api_key: &str) -> Result<ProviderConfig, ConfigError> {
        let kind = self.active_provider()?;
        let provider = self.provider_settings(kind);
        Ok(ProviderConfig {
            provider: kind,
            api_key: api_key.trim().to_string(),
            model: provider.model,
            base_url: provider.url.filter(|url| !url.trim().is_empty()),
        })
    }

    fn normalize(&mut self) {
        self.chat.max_conversation_length =
            clamp_max_conversation_length(self.chat.max_conversation_length);
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = HTTP_TIMEOUT_SECS;
        }
        // Older files called Gemini "google" and were not strict about case
        self.provider = self.provider.trim().to_lowercase();
        if self.provider == "google" {
            self.provider = ProviderKind::Gemini.id().to_string();
        }
        if let Some(google) = self.providers.remove("google") {
            self.providers
                .entry(ProviderKind::Gemini.id().to_string())
                .or_insert(google);
        }
    }
}

/// Write data to a file atomically by writing to a temp file first, then renaming.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ConfigError::Io(e)
    })
}

/// Load settings from `path`, writing defaults when the file does not exist yet.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        let defaults = Settings::default();
        save_settings_to(path, &defaults)?;
        tracing::info!(path = %path.display(), "wrote default settings");
        return Ok(defaults);
    }

    let content = fs::read_to_string(path)?;
    let mut settings: Settings = serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
        Settings::default()
    });
    settings.normalize();
    Ok(settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let mut settings = settings.clone();
    settings.normalize();
    let json = serde_json::to_string_pretty(&settings)?;
    atomic_write(path, json.as_bytes())
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = get_config_path().ok_or(ConfigError::NoConfigPath)?;
    load_settings_from(&path)
}

pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    let path = get_config_path().ok_or(ConfigError::NoConfigPath)?;
    save_settings_to(&path, settings)
}

fn get_keychain_service(kind: ProviderKind) -> String {
    format!("kitsune.{}", kind.id())
}

/// Deleting a key that was never stored is not an error.
fn deletion_result(result: Result<(), keyring::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(ConfigError::Keychain(format!(
            "Failed to delete API key from keychain: {}",
            e
        ))),
    }
}

/// API keys held in the OS keychain, cached after first read.
#[derive(Default)]
pub struct KeyStore {
    cache: Mutex<HashMap<ProviderKind, String>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(kind: ProviderKind) -> Result<Entry, ConfigError> {
        Entry::new(&get_keychain_service(kind), "api_key")
            .map_err(|e| ConfigError::Keychain(format!("Failed to access keychain: {}", e)))
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Option<String>, ConfigError> {
        if let Some(cached) = safe_lock_or_recover(&self.cache).get(&kind) {
            return Ok(Some(cached.clone()));
        }

        match Self::entry(kind)?.get_password() {
            Ok(api_key) => {
                safe_lock_or_recover(&self.cache).insert(kind, api_key.clone());
                Ok(Some(api_key))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ConfigError::Keychain(format!(
                "Failed to load API key from keychain: {}",
                e
            ))),
        }
    }

    pub fn set(&self, kind: ProviderKind, api_key: &str) -> Result<(), ConfigError> {
        if api_key.trim().is_empty() {
            return self.delete(kind);
        }
        Self::entry(kind)?
            .set_password(api_key.trim())
            .map_err(|e| ConfigError::Keychain(format!("Failed to save API key to keychain: {}", e)))?;
        safe_lock_or_recover(&self.cache).insert(kind, api_key.trim().to_string());
        Ok(())
    }

    pub fn delete(&self, kind: ProviderKind) -> Result<(), ConfigError> {
        safe_lock_or_recover(&self.cache).remove(&kind);
        deletion_result(Self::entry(kind)?.delete_credential())
    }

    /// Keychain first, then the plain-text fallback in the settings file.
    pub fn resolve(&self, kind: ProviderKind, settings: &Settings) -> Result<String, ConfigError> {
        match self.get(kind) {
            Ok(Some(api_key)) => return Ok(api_key),
            Ok(None) => {}
            Err(e) => tracing::warn!(provider = %kind, error = %e, "keychain unavailable"),
        }
        Ok(settings
            .provider_settings(kind)
            .api_key
            .unwrap_or_default())
    }
}

/// Resolve the active provider's config from the settings file and keychain.
pub fn load_provider_config(settings: &Settings, keys: &KeyStore) -> Result<ProviderConfig, ConfigError> {
    let kind = settings.active_provider()?;
    let api_key = keys.resolve(kind, settings)?;
    settings.provider_config(&api_key)
}

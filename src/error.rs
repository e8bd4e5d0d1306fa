use crate::utils::mutex::LockError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Missing, malformed or rejected API key.
    AuthError,
    RateLimited,
    /// Transport failure, timeout or provider-side outage.
    NetworkError,
    /// Provider answered but the payload could not be understood.
    MalformedResponse,
    /// The provider refused the request itself (bad model name, empty history).
    InvalidRequest,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::AuthError => "AuthError",
            ApiErrorKind::RateLimited => "RateLimited",
            ApiErrorKind::NetworkError => "NetworkError",
            ApiErrorKind::MalformedResponse => "MalformedResponse",
            ApiErrorKind::InvalidRequest => "InvalidRequest",
        }
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::AuthError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NetworkError, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::MalformedResponse, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidRequest, message)
    }

    /// Whether resending the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::RateLimited | ApiErrorKind::NetworkError
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProviderError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error executing code: {message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config path")]
    NoConfigPath,

    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error(transparent)]
    UnknownProvider(#[from] UnknownProviderError),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Please enter a message")]
    EmptyPrompt,

    #[error("A request is already in progress")]
    Busy,

    #[error("The request was cancelled")]
    Cancelled,

    #[error("No executable code found in the response")]
    NoCode,

    #[error("No code to execute")]
    NoPendingCode,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    UnknownProvider(#[from] UnknownProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    State(#[from] LockError),
}

impl ChatError {
    /// Line shown in the chat panel in place of an assistant reply.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Api(err) => match err.kind {
                ApiErrorKind::AuthError => format!(
                    "Error: {} Please check your API key in the addon preferences.",
                    err.message
                ),
                ApiErrorKind::RateLimited => format!(
                    "Error: {} Please wait a moment before trying again.",
                    err.message
                ),
                ApiErrorKind::NetworkError => format!(
                    "Error: {} Check your connection and resend the message.",
                    err.message
                ),
                _ => format!("Error: {}", err.message),
            },
            other => format!("Error: {}", other),
        }
    }

    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            ChatError::Api(err) => Some(err.kind),
            _ => None,
        }
    }
}

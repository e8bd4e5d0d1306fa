//! Kitsune core: turns natural-language prompts into Blender Python through a
//! pluggable set of AI providers, and hands the result back to the host for
//! preview and execution.

pub mod bridge;
pub mod chat;
pub mod error;
pub mod host;
pub mod logging;
pub mod models;
pub mod settings;
pub mod transcript;

pub mod utils {
    pub mod mutex;
}


pub use bridge::ExecutionBridge;
pub use chat::{ChatController, ChatSession, ProviderAdapter, ProviderRegistry};
pub use error::{ApiError, ApiErrorKind, ChatError, ConfigError, ExecutionError, UnknownProviderError};
pub use host::Host;
pub use logging::init_logging;
pub use models::{
    BlenderContextSnapshot, ChatMessage, ChatRole, GeneratedCode, ProviderConfig, ProviderKind,
};

use crate::error::{ConfigError, ExecutionError};
use crate::models::{BlenderContextSnapshot, ProviderConfig};

/// Everything the chat core needs from the host application.
///
/// Host state is always passed in through this trait, never read globally,
/// so the core can be driven by a fake host in tests.
pub trait Host: Send + Sync {
    /// Current mode, selection and scene summary.
    fn context(&self) -> BlenderContextSnapshot;

    /// Provider, key and model the user has configured.
    fn preferences(&self) -> Result<ProviderConfig, ConfigError>;

    /// Run `source` in the host's script interpreter.
    fn run_script(&self, source: &str) -> Result<(), ExecutionError>;
}

// Chat module - provider adapters, session state and code extraction
pub mod controller;
pub mod extract;
pub mod helpers;
pub mod providers;
pub mod registry;
pub mod session;

// Re-export the pieces hosts wire together
pub use controller::ChatController;
pub use extract::{extract, extract_source};
pub use providers::ProviderAdapter;
pub use registry::ProviderRegistry;
pub use session::ChatSession;

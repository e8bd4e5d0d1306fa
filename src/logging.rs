use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KITSUNE_LOG";

/// Filter used when `KITSUNE_LOG` is unset or invalid.
pub fn default_filter(debug_mode: bool) -> &'static str {
    if debug_mode {
        "kitsune=debug,info"
    } else {
        "kitsune=info,warn"
    }
}

/// Install the global fmt subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logging(debug_mode: bool) {
    let env_filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_filter(debug_mode)),
    };

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();

    match result {
        Ok(()) => tracing::debug!(debug_mode, "logging initialised"),
        Err(_) => tracing::debug!("logging already initialised"),
    }
}

//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=fleetdesk_db=trace` - Show trace for the database crate only
/// - Otherwise `default_filter` (see [`crate::config::DEFAULT_LOG_FILTER`])
///
/// Calling it again is harmless; the first subscriber stays installed.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

//! Tracing initialization.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level so a deployment can be
/// inspected without a config change.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

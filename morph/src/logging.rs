//! Diagnostic tracing for the driver.
//!
//! Engine code only emits `tracing` events; installing a subscriber is left to
//! the binary. Run reports are printed separately and are unaffected by the
//! filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_filter` when it is unset or
/// invalid. Output goes to stderr in compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=morph=debug morph run --root app --template upgrade.toml
/// ```
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

//! Structured logging infrastructure for CSIV.
//!
//! Library crates only emit `tracing` events; binaries pick a subscriber here.
//! Events go to stderr so stdout stays free for machine-readable output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use csiv_core::logging;
///
/// logging::init();
/// tracing::info!("Simulation started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

/// Initialize the logging system with JSON output, one event per line.
///
/// # Example
/// ```no_run
/// use csiv_core::logging;
///
/// logging::init_json();
/// tracing::info!(towers = 12, "World generated");
/// ```
pub fn init_json() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
        .init();
}

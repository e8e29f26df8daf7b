//! Logging setup for the porchlight binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the porchlight library crates and the binary itself.
/// `RUST_LOG` takes precedence when it is set.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "porchlight_server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
///
/// # Examples
///
/// ```no_run
/// use porchlight_shared::logger::setup_logger;
///
/// setup_logger("porchlight_server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(binary_name: &str, level: &str) -> String {
    let binary = binary_name.replace('-', "_");
    format!(
        "porchlight_shared={level},porchlight_server={level},porchlight_client={level},{binary}={level},tower_http={level}"
    )
}

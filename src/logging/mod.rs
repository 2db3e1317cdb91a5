// Logging module for structured logging using the tracing crate

use crate::config::{LogConfig, LogFormat};
use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON or human-readable formatting, per [`LogConfig::format`]
/// - Filtering from `RUST_LOG` when set, otherwise [`LogConfig::level`]
/// - Output to stderr so rendered images can be piped on stdout
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
///
/// # Examples
///
/// ```
/// use photomark::config::LogConfig;
/// use photomark::logging::init_subscriber;
///
/// // Initialize logging at application startup
/// init_subscriber(&LogConfig::default()).expect("Failed to initialize logging");
///
/// // A second call reports the existing subscriber instead of panicking
/// assert!(init_subscriber(&LogConfig::default()).is_err());
///
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LogConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
}

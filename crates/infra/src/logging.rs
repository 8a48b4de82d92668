//! Structured logging initialization.
//!
//! Installs a tracing subscriber for the host process. The `RUST_LOG`
//! environment variable takes precedence over the configured level. Report
//! lines are emitted under the `tally::report` target, so they can be routed
//! or silenced with a directive such as `tally::report=off`.

use tally_domain::{LogFormat, LoggingConfig, Result, TallyError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global subscriber.
///
/// # Example
///
/// ```no_run
/// use tally_domain::LoggingConfig;
/// use tally_infra::logging;
///
/// logging::init(&LoggingConfig::default()).ok();
/// tracing::info!("Service starting");
/// ```
///
/// # Errors
/// Returns `TallyError::Config` if the level directive is invalid or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::try_new(config.level.as_str()).map_err(|e| {
            TallyError::Config(format!("Invalid log level '{}': {e}", config.level))
        })?,
    };

    let installed = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
    };

    installed.map_err(|e| TallyError::Config(format!("Logging already initialized: {e}")))
}

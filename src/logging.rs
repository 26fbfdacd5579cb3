//! Structured logging setup
//!
//! Logs go to stderr so reports printed on stdout stay machine-readable.
//! The `SPARSYNC_LOG` environment variable takes precedence over `-v`.

use crate::types::SyncError;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "SPARSYNC_LOG";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Map `-v` occurrences to a level name
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber
pub fn init_logging(verbose: u8, format: LogFormat) -> Result<(), SyncError> {
    let filter = build_env_filter(verbose)?;
    let base_subscriber = Registry::default().with(filter);

    let result = match format {
        LogFormat::Json => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| SyncError::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_env_filter(verbose: u8) -> Result<EnvFilter, SyncError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }

    EnvFilter::try_new(level_for_verbosity(verbose))
        .map_err(|e| SyncError::Config(format!("Invalid log directive: {}", e)))
}

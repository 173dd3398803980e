//! Logging for Voucher Hub
//!
//! Provides:
//! - [`init_tracing`]: installs the global `tracing` subscriber, pretty for
//!   development terminals and JSON for everything else
//! - [`PiiRedactor`] and the [`redact`] / [`mask_phone`] helpers, so customer
//!   phone numbers and e-mail addresses never reach a log line in clear text
//!
//! # Example
//!
//! ```no_run
//! use logger_redacted::{init_tracing, mask_phone, LoggerConfig};
//!
//! init_tracing(&LoggerConfig::default()).unwrap();
//! tracing::info!(customer = %mask_phone("0501234567"), "Redemption logged");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter {directive:?}: {message}")]
    InvalidFilter { directive: String, message: String },

    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(&config.log_level)).map_err(|e| {
            LoggerError::InvalidFilter {
                directive: config.log_level.clone(),
                message: e.to_string(),
            }
        })?,
    };

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

fn default_directive(level: &str) -> String {
    format!(
        "hub_sync={level},voucher_hub={level},ops_cli={level},sqlx=warn,reqwest=info,hyper=info",
        level = level
    )
}

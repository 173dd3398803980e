use crate::codes;
use hub_sync::SyncError;
use logger_redacted::{redact, LoggerError};
use thiserror::Error;

/// Error surfaced by Voucher Hub front ends
#[derive(Error, Debug)]
pub enum HubError {
    /// Engine failures (local cache, wipe, bad input)
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(#[from] LoggerError),

    /// Command-line or configuration problem outside the engine
    #[error("Usage error: {0}")]
    Usage(String),

    /// The user declined a destructive operation
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HubError {
    pub fn usage(message: impl Into<String>) -> Self {
        HubError::Usage(message.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            HubError::Sync(SyncError::Cache(_)) => codes::cache::UNAVAILABLE,
            HubError::Sync(SyncError::Serialization(_)) => codes::cache::CORRUPT_ENTRY,
            HubError::Sync(SyncError::InvalidInput(_)) => codes::validation::INVALID_INPUT,
            HubError::Sync(SyncError::WipeFailed(_)) => codes::remote::WIPE_FAILED,
            HubError::Sync(SyncError::Config(_)) => codes::config::INVALID,
            HubError::Sync(SyncError::Internal(_)) => codes::system::INTERNAL,
            HubError::Logging(_) => codes::config::LOGGING,
            HubError::Usage(_) => codes::validation::USAGE,
            HubError::Aborted(_) => codes::validation::ABORTED,
            HubError::Other(_) => codes::system::INTERNAL,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            HubError::Usage(_) | HubError::Sync(SyncError::InvalidInput(_)) => codes::exit::USAGE,
            HubError::Aborted(_) => codes::exit::ABORTED,
            HubError::Sync(SyncError::WipeFailed(_)) => codes::exit::REMOTE,
            HubError::Sync(SyncError::Config(_)) | HubError::Logging(_) => codes::exit::CONFIG,
            _ => codes::exit::FAILURE,
        }
    }
}

/// Result type alias for Voucher Hub front ends
pub type Result<T> = std::result::Result<T, HubError>;

/// Log an error with its code; free text is redacted first
pub fn log_error(context: &str, error: &HubError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %redact(&error.to_string()),
        "Voucher Hub error occurred"
    );
}

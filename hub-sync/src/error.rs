//! Error types for the sync engine
//!
//! Two layers:
//! - [`RemoteError`]: what a remote store call can fail with. The engine
//!   swallows these and falls back to the local cache.
//! - [`SyncError`]: what an engine operation can fail with. Only local cache
//!   failures and a failed remote wipe reach the caller.

use thiserror::Error;

/// Failure of a single remote store call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure, timeout, or remote not reachable
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// Remote answered but refused the request (constraint violation, auth failure)
    #[error("Remote rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Remote answered with a body we could not decode
    #[error("Malformed remote response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether this failure means the remote should be treated as offline.
    ///
    /// A reconcile pass stops at the first such failure; a rejection only
    /// leaves the affected record pending.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Malformed(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RemoteError::Unavailable(err.to_string())
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Local cache error: {0}")]
    Cache(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote wipe failed, local records kept: {0}")]
    WipeFailed(RemoteError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<::config::ConfigError> for SyncError {
    fn from(err: ::config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

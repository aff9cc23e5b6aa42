//! Error types for synchronization passes and list sources.

use gatesync_client::Retryable;
use gatesync_core::GatewayError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for synchronization operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Errors that stop a synchronization pass
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote state could not be read or an unrecoverable API failure occurred
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Invalid synchronization options
    #[error("invalid options: {0}")]
    Options(String),
}

/// Failure fetching one raw list source.
///
/// Never fatal: the loader logs it and the source contributes no text.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level download failure
    #[error("download of {url} failed: {reason}")]
    Download {
        /// Source URL
        url: String,
        /// Underlying error
        reason: String,
        /// Whether the failure was a timeout or connection error
        transient: bool,
    },

    /// Server answered with a non-success status
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// Source URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// HTTP client for downloads could not be built
    #[error("failed to build download client: {0}")]
    Client(String),

    /// Local seed file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Download { transient, .. } => *transient,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Client(_) | Self::Read { .. } => false,
        }
    }

    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

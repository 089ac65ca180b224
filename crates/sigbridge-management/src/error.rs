//! Management layer errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the management endpoint and the log directory.
#[derive(Error, Debug)]
pub enum ManagementError {
    /// The requested log file does not exist (or the name does not resolve
    /// inside the log directory).
    #[error("log file not found: {0}")]
    NotFound(String),

    /// Reading the log directory failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The endpoint could not bind its listener.
    #[error("failed to bind management endpoint on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl ManagementError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for management operations.
pub type ManagementResult<T> = Result<T, ManagementError>;

//! Custom error types for the NameNode backup tool.

use crate::namenode::protocol::Detection;
use std::path::PathBuf;
use thiserror::Error;

/// Run-level failure. Every variant is terminal for the invocation.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Release {declared} was specified via --release, however the server reports it is running: {detected}")]
    ProtocolMismatch { declared: u8, detected: Detection },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Edits discovery failed: {0}")]
    Scan(#[from] ScanError),

    #[error("No edit segments modified in the last {lookback_secs}s were found in {}; supply --startTxId and --endTxId", dir.display())]
    NoEditSegments { dir: PathBuf, lookback_secs: i64 },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl BackupError {
    /// Errors caused by how the tool was invoked; these get the usage line.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            BackupError::InputValidation(_)
                | BackupError::ProtocolMismatch { .. }
                | BackupError::NoEditSegments { .. }
        )
    }
}

/// Failure of a single streaming download.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("server rejected the request with HTTP {status}: {body_excerpt}")]
    RemoteRejected { status: u16, body_excerpt: String },

    #[error("failed to reach the server: {reason}")]
    Transport { reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let reason = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        FetchError::Transport { reason }
    }
}

/// Failure while listing the local edits directory.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("the edits directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("the edits directory {} is not readable", .0.display())]
    PermissionDenied(PathBuf),

    #[error("lookback window must be a non-negative number of seconds, got {0}")]
    InvalidLookbackWindow(i64),

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackupError>;

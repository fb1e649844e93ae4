//! Error types
//!
//! `FsError` is what the namespace hands back across the filesystem boundary,
//! `BackendError` is what the media backend reports, and `ApiError` covers the
//! configuration and tooling layers around them.

use crate::types::HandleId;
use thiserror::Error;

/// Failures reported by namespace operations.
///
/// Cloneable so a single failed rebuild can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("not a file: {path}")]
    NotAFile { path: String },

    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        path: String,
        operation: &'static str,
    },

    #[error("{operation}: not supported: {path}")]
    NotSupported {
        path: String,
        operation: &'static str,
    },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to fetch recordings: {0}")]
    Fetch(String),

    #[error("invalid handle: {handle}")]
    InvalidHandle { handle: HandleId },
}

impl FsError {
    /// Standard errno for this failure, as expected by the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound { .. } => libc::ENOENT,
            FsError::NotADirectory { .. } => libc::ENOTDIR,
            FsError::NotAFile { .. } => libc::EISDIR,
            FsError::PermissionDenied { .. } => libc::EACCES,
            FsError::NotSupported { .. } => libc::ENOTSUP,
            FsError::Io { .. } | FsError::Fetch(_) => libc::EIO,
            FsError::InvalidHandle { .. } => libc::EBADF,
        }
    }

    pub(crate) fn io(path: &str, message: impl ToString) -> Self {
        FsError::Io {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// Failures reported by a media backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("unknown recording: {0}")]
    UnknownRecord(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by configuration, logging and command-line tooling.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! Error types for file operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a file operation.
#[derive(Debug, Error)]
pub enum OpError {
    /// The source of an operation does not exist.
    #[error("Source does not exist: {path}")]
    SourceMissing { path: PathBuf },

    /// The destination is missing or not a directory.
    #[error("Invalid destination {path}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    /// The destination directory cannot be written.
    #[error("Cannot write to {path}")]
    NotWritable { path: PathBuf },

    /// An item with the target name already exists.
    #[error("An item with the same name already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A directory would be copied or moved into itself.
    #[error("Cannot copy/move {path} into itself or one of its subfolders ({destination})")]
    SourceIsAncestor { path: PathBuf, destination: PathBuf },

    /// A user-supplied name is not usable.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The request itself is malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path vanished while the operation was running.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some nodes of a tree could not be processed.
    #[error("{failed} item(s) under {path} could not be processed")]
    Incomplete { path: PathBuf, failed: usize },

    /// A move copied its source but could not remove the original.
    #[error(
        "Copied {original} to {target} but could not remove the original ({})",
        compensation_note(.compensated)
    )]
    CriticalMove {
        original: PathBuf,
        target: PathBuf,
        /// The target was removed again and all data is back at `original`.
        compensated: bool,
    },

    /// An archive entry would be written outside the extraction directory.
    #[error("Archive entry is trying to escape the target directory: {entry}")]
    PathTraversal { entry: String },

    /// The archive container is corrupt or unsupported.
    #[error("Archive error at {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// The operation was cancelled before it finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// The executor no longer accepts work.
    #[error("Operation executor has shut down")]
    ExecutorClosed,

    /// The worker running an operation stopped before reporting a result.
    #[error("Operation worker failed: {message}")]
    WorkerFailed { message: String },
}

fn compensation_note(compensated: &bool) -> &'static str {
    if *compensated {
        "copy removed"
    } else {
        "data is now split between both locations"
    }
}

/// Coarse classification of an [`OpError`] used for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Detected before any I/O; nothing was changed.
    Validation,
    /// Stream or listing failure; partial artifacts were rolled back.
    Io,
    /// Same handling as `Io`, distinct message.
    Permission,
    /// Data may exist in two places.
    Critical,
    /// Archive content tried to escape its directory.
    Security,
    /// Stopped on request.
    Cancelled,
}

impl OpError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid destination error.
    pub fn invalid_destination(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceMissing { .. }
            | Self::InvalidDestination { .. }
            | Self::NotWritable { .. }
            | Self::AlreadyExists { .. }
            | Self::SourceIsAncestor { .. }
            | Self::InvalidName { .. }
            | Self::InvalidRequest { .. }
            | Self::ExecutorClosed => ErrorCategory::Validation,
            Self::PermissionDenied { .. } => ErrorCategory::Permission,
            Self::NotFound { .. }
            | Self::Io { .. }
            | Self::Incomplete { .. }
            | Self::Archive { .. } => ErrorCategory::Io,
            Self::CriticalMove { .. } | Self::WorkerFailed { .. } => ErrorCategory::Critical,
            Self::PathTraversal { .. } => ErrorCategory::Security,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Check if this error was caught before anything was modified.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

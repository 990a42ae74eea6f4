//! Progress reporting and outcome types for file operations.

use std::path::PathBuf;

use filedeck_core::{ErrorCategory, OpError};
use serde::Serialize;

use crate::operation::OperationKind;

/// Progress information for an ongoing operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationProgress {
    /// The kind of operation.
    pub kind: OperationKind,
    /// Name of the item about to be processed.
    pub current_item: String,
    /// Zero-based position of the current item.
    pub index: usize,
    /// Total number of items.
    pub total: usize,
    /// Items finished successfully so far.
    pub succeeded: usize,
    /// Items failed so far.
    pub failed: usize,
}

impl OperationProgress {
    /// Progress as a percentage (0.0 to 100.0) of items started.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.index as f64 / self.total as f64) * 100.0
        }
    }
}

/// An error recorded against one item of an operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
    /// Coarse classification for user feedback.
    pub category: ErrorCategory,
}

impl OperationError {
    /// Record `error` against `path`.
    pub fn new(path: impl Into<PathBuf>, error: &OpError) -> Self {
        Self {
            path: path.into(),
            message: error.to_string(),
            category: error.category(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of a completed operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    /// The kind of operation.
    pub kind: OperationKind,
    /// Number of items successfully processed.
    pub success_count: usize,
    /// Number of items that failed.
    pub failure_count: usize,
    /// Errors in the order they happened.
    pub errors: Vec<OperationError>,
    /// Directory whose contents changed.
    pub affected_directory: Option<PathBuf>,
}

impl OperationOutcome {
    pub(crate) fn new(kind: OperationKind, affected_directory: Option<PathBuf>) -> Self {
        Self {
            kind,
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
            affected_directory,
        }
    }

    /// An outcome where every item failed with the same error.
    pub fn failed(
        kind: OperationKind,
        items: usize,
        path: impl Into<PathBuf>,
        error: &OpError,
    ) -> Self {
        Self {
            kind,
            success_count: 0,
            failure_count: items.max(1),
            errors: vec![OperationError::new(path, error)],
            affected_directory: None,
        }
    }

    /// An outcome for an operation stopped before it produced a result.
    pub fn cancelled(kind: OperationKind, items: usize) -> Self {
        Self::failed(kind, items, PathBuf::new(), &OpError::Cancelled)
    }

    pub(crate) fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub(crate) fn record_failure(&mut self, path: impl Into<PathBuf>, error: &OpError) {
        self.failure_count += 1;
        self.errors.push(OperationError::new(path, error));
    }

    /// The first error, if any.
    pub fn first_error(&self) -> Option<&OperationError> {
        self.errors.first()
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    /// Check if the operation was stopped by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.category == ErrorCategory::Cancelled)
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.kind {
            OperationKind::Copy => "Copied",
            OperationKind::Move => "Moved",
            OperationKind::Delete => "Deleted",
            OperationKind::Compress => "Compressed",
            OperationKind::Extract => "Extracted",
            OperationKind::Rename => "Renamed",
            OperationKind::CreateFolder => "Created",
        };

        match (self.failure_count, self.first_error()) {
            (0, _) => format!("{} {} items", action, self.success_count),
            (failed, Some(first)) => format!(
                "{} {} items, {} failed: {}",
                action, self.success_count, failed, first.message
            ),
            (failed, None) => format!("{} {} items, {} failed", action, self.success_count, failed),
        }
    }
}

/// Event sent through an operation's channel.
#[derive(Debug, Clone, Serialize)]
pub enum OperationEvent {
    /// Progress update. May be dropped when the receiver lags.
    Progress(OperationProgress),
    /// The operation completed. Always delivered, always last.
    Complete(OperationOutcome),
}

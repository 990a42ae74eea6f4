//! File operations engine for filedeck.
//!
//! [`Engine`] performs the operations synchronously: recursive copy and
//! delete, move with a copy fallback, rename, folder creation, and ZIP
//! compression and extraction. [`OperationExecutor`] runs them one at a
//! time on a background worker and reports progress and outcomes over
//! per-operation channels.

mod batch;
mod compress;
pub mod conflict;
mod copy;
mod create;
mod delete;
mod engine;
mod executor;
mod extract;
mod fs;
mod listing;
mod move_op;
pub mod naming;
mod operation;
mod progress;
mod rename;

pub use engine::Engine;
pub use executor::{DirectoryListener, OperationExecutor, OperationHandle, ShutdownMode};
pub use fs::{Filesystem, StdFilesystem};
pub use listing::{list_directory, needs_refresh};
pub use operation::{OperationKind, OperationRequest};
pub use progress::{OperationError, OperationEvent, OperationOutcome, OperationProgress};
pub use rename::validate_filename;

//! Rename operation.

use std::path::{Path, PathBuf};

use filedeck_core::{OpError, is_writable, paths};
use tracing::{debug, warn};

use crate::engine::Engine;

impl Engine {
    /// Rename `source` to `new_name` within its parent directory.
    ///
    /// Renaming to the current name is a no-op. An existing node with the
    /// new name is never replaced. Returns the new path.
    pub fn rename(&self, source: &Path, new_name: &str) -> Result<PathBuf, OpError> {
        validate_filename(new_name)?;

        if !paths::exists(source) {
            return Err(OpError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        let target = source.with_file_name(new_name);
        let parent = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        if target == source {
            return Ok(target);
        }

        if !is_writable(parent) {
            return Err(OpError::NotWritable {
                path: parent.to_path_buf(),
            });
        }

        if paths::exists(&target) {
            return Err(OpError::AlreadyExists { path: target });
        }

        match self.fs().rename(source, &target) {
            Ok(()) => {
                debug!(source = %source.display(), target = %target.display(), "Renamed");
                Ok(target)
            }
            // Some filesystems report failure after completing the rename.
            Err(e) if paths::exists(&target) && !paths::exists(source) => {
                debug!(target = %target.display(), error = %e, "Rename reported failure but completed");
                Ok(target)
            }
            Err(e) => {
                warn!(source = %source.display(), target = %target.display(), error = %e, "Rename failed");
                Err(OpError::io(source, e))
            }
        }
    }
}

/// Validate a user-supplied file or folder name.
///
/// Names are checked for portability, so characters reserved on other
/// platforms (`\` and `:`) are refused everywhere.
pub fn validate_filename(name: &str) -> Result<(), OpError> {
    let reject = |reason: &str| -> Result<(), OpError> { Err(OpError::invalid_name(name, reason)) };

    if name.is_empty() {
        return reject("name cannot be empty");
    }

    if name.len() > 255 {
        return reject("name is too long (max 255 bytes)");
    }

    for c in ['/', '\\', ':', '\0'] {
        if name.contains(c) {
            return reject(&format!("name cannot contain '{}'", c.escape_default()));
        }
    }

    if name == "." || name == ".." {
        return reject("'.' and '..' are reserved names");
    }

    Ok(())
}

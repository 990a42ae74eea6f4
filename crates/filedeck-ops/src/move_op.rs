//! Move with rename fast path and copy + delete fallback.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{OpError, paths};
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, leaf_name, validate_destination};

impl Engine {
    /// Move `source` into `destination_dir`, keeping its name.
    ///
    /// Tries an atomic rename first and falls back to copy then delete when
    /// the rename fails for any reason. An existing target is never
    /// overwritten. Returns the final path of the moved node.
    ///
    /// If the copy succeeded but the original could not be removed, the
    /// copy is pruned of every entry whose original still exists and the
    /// move fails with [`OpError::CriticalMove`]. It is compensated only if
    /// nothing of the target remains.
    pub fn move_into(&self, source: &Path, destination_dir: &Path) -> Result<PathBuf, OpError> {
        if !paths::exists(source) {
            return Err(OpError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        validate_destination(destination_dir)?;

        let name = leaf_name(source)
            .ok_or_else(|| OpError::invalid_request(format!("{} has no name", source.display())))?;
        let target = destination_dir.join(name);

        if paths::same_node(source, &target) {
            debug!(path = %source.display(), "Source already in destination");
            return Ok(target);
        }

        if source.is_dir() && paths::is_nested_under(&target, source) {
            warn!(
                source = %source.display(),
                destination = %destination_dir.display(),
                "Cannot move a directory into itself"
            );
            return Err(OpError::SourceIsAncestor {
                path: source.to_path_buf(),
                destination: target,
            });
        }

        if paths::exists(&target) {
            return Err(OpError::AlreadyExists { path: target });
        }

        self.checkpoint()?;

        match self.fs().rename(source, &target) {
            Ok(()) => {
                debug!(source = %source.display(), target = %target.display(), "Moved by rename");
                return Ok(target);
            }
            Err(e) => {
                info!(
                    source = %source.display(),
                    target = %target.display(),
                    error = %e,
                    "Rename failed, falling back to copy and delete"
                );
            }
        }

        if let Err(err) = self.copy(source, &target) {
            warn!(source = %source.display(), error = %err, "Move copy phase failed");
            if let Err(e) = self.discard(&target) {
                warn!(path = %target.display(), error = %e, "Failed to remove partial move target");
            }
            return Err(err);
        }

        // Past this point the original must go, cancelled or not.
        if let Err(err) = self.discard(source) {
            error!(
                source = %source.display(),
                target = %target.display(),
                error = %err,
                "Copied but could not delete original"
            );
            let failed = self.prune_duplicates(&target, source);
            if failed > 0 {
                error!(
                    target = %target.display(),
                    failed,
                    "Could not remove duplicated entries from move target"
                );
            }
            let compensated = !paths::exists(&target);
            return Err(OpError::CriticalMove {
                original: source.to_path_buf(),
                target,
                compensated,
            });
        }

        debug!(source = %source.display(), target = %target.display(), "Moved by copy and delete");
        Ok(target)
    }

    /// Remove entries of `copy` whose counterpart in `original` still exists.
    ///
    /// Entries whose original is gone are kept so no data ends up with zero
    /// copies. Returns the number of entries that should have been removed
    /// but could not be.
    fn prune_duplicates(&self, copy: &Path, original: &Path) -> usize {
        let Ok(metadata) = fs::symlink_metadata(copy) else {
            return 0;
        };

        if !metadata.is_dir() {
            if !paths::exists(original) {
                return 0;
            }
            return match self.fs().remove_file(copy) {
                Ok(()) => 0,
                Err(e) => {
                    warn!(path = %copy.display(), error = %e, "Failed to prune duplicate");
                    1
                }
            };
        }

        let mut failed = 0;
        if let Ok(entries) = fs::read_dir(copy) {
            for entry in entries.flatten() {
                failed += self.prune_duplicates(&entry.path(), &original.join(entry.file_name()));
            }
        }

        // Only empties out; a directory still holding sole copies stays.
        if paths::exists(original) {
            let empty = fs::read_dir(copy)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if empty {
                if let Err(e) = self.fs().remove_dir(copy) {
                    warn!(path = %copy.display(), error = %e, "Failed to prune duplicate directory");
                    failed += 1;
                }
            }
        }

        failed
    }
}

//! Recursive, best-effort deletion.

use std::fs;
use std::io;
use std::path::Path;

use filedeck_core::OpError;
use tracing::{debug, warn};

use crate::engine::Engine;

impl Engine {
    /// Delete a file or a whole directory tree.
    ///
    /// A missing path is a success. Directory children are deleted depth
    /// first; a failing child does not stop its siblings, but the call then
    /// reports [`OpError::Incomplete`]. Symlinks are removed, never followed.
    pub fn delete(&self, path: &Path) -> Result<(), OpError> {
        self.remove_tree(path, true)
    }

    /// Delete a tree regardless of cancellation.
    ///
    /// Used for rollback of partial artifacts and for the delete phase of a
    /// move, which must not stop halfway once the copy exists.
    pub(crate) fn discard(&self, path: &Path) -> Result<(), OpError> {
        self.remove_tree(path, false)
    }

    fn remove_tree(&self, path: &Path, cancellable: bool) -> Result<(), OpError> {
        if cancellable {
            self.checkpoint()?;
        }

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat node for deletion");
                return Err(OpError::io(path, e));
            }
        };

        if !metadata.is_dir() {
            return self.fs().remove_file(path).map_err(|e| {
                warn!(path = %path.display(), error = %e, "Failed to delete file");
                OpError::io(path, e)
            });
        }

        let entries = fs::read_dir(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Cannot list directory for deletion");
            OpError::io(path, e)
        })?;

        let mut failed = 0usize;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read directory entry");
                    failed += 1;
                    continue;
                }
            };

            match self.remove_tree(&entry.path(), cancellable) {
                Ok(()) => {}
                Err(OpError::Cancelled) => return Err(OpError::Cancelled),
                Err(OpError::Incomplete { failed: nested, .. }) => failed += nested,
                Err(_) => failed += 1,
            }
        }

        match self.fs().remove_dir(path) {
            Ok(()) if failed == 0 => {
                debug!(path = %path.display(), "Deleted directory");
                Ok(())
            }
            Ok(()) => Err(OpError::Incomplete {
                path: path.to_path_buf(),
                failed,
            }),
            Err(e) if failed > 0 => {
                debug!(path = %path.display(), error = %e, "Directory kept after child failures");
                Err(OpError::Incomplete {
                    path: path.to_path_buf(),
                    failed,
                })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete directory");
                Err(OpError::io(path, e))
            }
        }
    }
}

//! Recursive copy with per-node rollback.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use filedeck_core::{OpError, paths};
use tracing::{debug, warn};

use crate::engine::Engine;

impl Engine {
    /// Copy `source` (a file or a directory tree) to `destination`.
    ///
    /// `destination` is the full path of the copy, not its parent. Copying a
    /// node onto itself is a no-op success; copying a directory into its own
    /// subtree fails before anything is written. Existing destination files
    /// are overwritten.
    ///
    /// Directory copies are best-effort: a failing child is rolled back and
    /// reported through [`OpError::Incomplete`] while its siblings are still
    /// copied. Returns the number of bytes copied.
    pub fn copy(&self, source: &Path, destination: &Path) -> Result<u64, OpError> {
        let metadata = fs::metadata(source).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => OpError::SourceMissing {
                path: source.to_path_buf(),
            },
            _ => OpError::io(source, e),
        })?;

        if paths::same_node(source, destination) {
            debug!(path = %source.display(), "Source and destination are the same");
            return Ok(0);
        }

        if metadata.is_dir() && paths::is_nested_under(destination, source) {
            warn!(
                source = %source.display(),
                destination = %destination.display(),
                "Cannot copy a directory into itself"
            );
            return Err(OpError::SourceIsAncestor {
                path: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }

        let created = !paths::exists(destination);
        let result = self.copy_node(source, destination, metadata.is_dir());

        if matches!(result, Err(OpError::Cancelled)) && created {
            if let Err(e) = self.discard(destination) {
                warn!(path = %destination.display(), error = %e, "Failed to roll back cancelled copy");
            }
        }

        result
    }

    fn copy_node(&self, source: &Path, destination: &Path, is_dir: bool) -> Result<u64, OpError> {
        self.checkpoint()?;
        if is_dir {
            self.copy_dir(source, destination)
        } else {
            self.copy_file(source, destination)
        }
    }

    fn copy_dir(&self, source: &Path, destination: &Path) -> Result<u64, OpError> {
        let created = match fs::metadata(destination) {
            Ok(metadata) if metadata.is_dir() => false,
            Ok(_) => {
                warn!(path = %destination.display(), "Destination exists but is not a directory");
                return Err(OpError::invalid_destination(
                    destination,
                    "exists but is not a directory",
                ));
            }
            Err(_) => {
                fs::create_dir_all(destination).map_err(|e| {
                    warn!(path = %destination.display(), error = %e, "Cannot create directory");
                    OpError::io(destination, e)
                })?;
                debug!(path = %destination.display(), "Created directory");
                true
            }
        };

        let entries = match fs::read_dir(source) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Cannot list source directory");
                if created {
                    if let Err(e) = self.discard(destination) {
                        warn!(
                            path = %destination.display(),
                            error = %e,
                            "Failed to remove new directory"
                        );
                    }
                }
                return Err(OpError::io(source, e));
            }
        };

        let mut bytes = 0u64;
        let mut failed = 0usize;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "Failed to read directory entry");
                    failed += 1;
                    continue;
                }
            };

            let child = entry.path();
            let child_destination = destination.join(entry.file_name());

            // Follows symlinks: linked files are copied as content.
            let metadata = match fs::metadata(&child) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %child.display(), error = %e, "Cannot read metadata");
                    failed += 1;
                    continue;
                }
            };

            let is_link = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
            if is_link && metadata.is_dir() {
                warn!(path = %child.display(), "Skipping symlinked directory");
                continue;
            }

            match self.copy_node(&child, &child_destination, metadata.is_dir()) {
                Ok(copied) => bytes += copied,
                Err(OpError::Cancelled) => return Err(OpError::Cancelled),
                Err(OpError::Incomplete { failed: nested, .. }) => failed += nested,
                Err(_) => failed += 1,
            }
        }

        if failed > 0 {
            return Err(OpError::Incomplete {
                path: source.to_path_buf(),
                failed,
            });
        }

        Ok(bytes)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, OpError> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    warn!(path = %parent.display(), error = %e, "Cannot create parent directory");
                    OpError::io(parent, e)
                })?;
            }
        }

        let mut input = File::open(source).map_err(|e| {
            warn!(path = %source.display(), error = %e, "Cannot open source file");
            OpError::io(source, e)
        })?;
        self.write_file(&mut input, source, destination)
    }

    /// Stream `input` into `destination`, removing the partial file if the
    /// stream fails or is cancelled.
    fn write_file(
        &self,
        input: &mut impl Read,
        source: &Path,
        destination: &Path,
    ) -> Result<u64, OpError> {
        let mut output = File::create(destination).map_err(|e| {
            warn!(path = %destination.display(), error = %e, "Cannot create destination file");
            OpError::io(destination, e)
        })?;

        match self.stream(input, &mut output, source, destination) {
            Ok(bytes) => {
                debug!(source = %source.display(), destination = %destination.display(), bytes, "Copied file");
                Ok(bytes)
            }
            Err(err) => {
                drop(output);
                warn!(
                    source = %source.display(),
                    destination = %destination.display(),
                    error = %err,
                    "Copy failed, removing partial file"
                );
                if let Err(e) = self.discard(destination) {
                    warn!(path = %destination.display(), error = %e, "Failed to remove partial file");
                }
                Err(err)
            }
        }
    }
}

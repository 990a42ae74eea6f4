//! ZIP extraction into a fresh directory, guarded against path traversal.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use filedeck_core::{OpError, paths};
use tracing::{debug, error, warn};
use zip::ZipArchive;

use crate::compress::zip_error;
use crate::engine::{Engine, validate_destination};
use crate::naming;

impl Engine {
    /// Extract `archive` into a new directory inside `parent`.
    ///
    /// `parent` defaults to the directory holding the archive. The new
    /// directory is named after the archive with the configured suffix
    /// ("photos.zip" extracts into "photos_extracted", then
    /// "photos_extracted_1", ...). Every entry must resolve strictly inside
    /// that directory; on the first escaping entry, or any other failure,
    /// the whole extraction directory is removed.
    pub fn extract(&self, archive: &Path, parent: Option<&Path>) -> Result<PathBuf, OpError> {
        match fs::metadata(archive) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(OpError::invalid_request(format!(
                    "{} is not a file",
                    archive.display()
                )));
            }
            Err(_) => {
                return Err(OpError::SourceMissing {
                    path: archive.to_path_buf(),
                });
            }
        }

        let parent = match parent {
            Some(parent) => parent.to_path_buf(),
            None => archive
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        validate_destination(&parent)?;

        let file = File::open(archive).map_err(|e| OpError::io(archive, e))?;
        let mut zip = ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;

        let base = naming::archive_base_name(archive);
        let root = naming::extraction_dir(&parent, &base, &self.config().extract_suffix);
        fs::create_dir_all(&root).map_err(|e| OpError::io(&root, e))?;

        let result = self.extract_entries(&mut zip, archive, &root);
        drop(zip);

        match result {
            Ok(count) => {
                debug!(archive = %archive.display(), root = %root.display(), count, "Archive extracted");
                Ok(root)
            }
            Err(err) => {
                warn!(archive = %archive.display(), error = %err, "Extraction failed, removing output");
                if let Err(e) = self.discard(&root) {
                    warn!(path = %root.display(), error = %e, "Failed to remove extraction directory");
                }
                Err(err)
            }
        }
    }

    fn extract_entries(
        &self,
        zip: &mut ZipArchive<File>,
        archive: &Path,
        root: &Path,
    ) -> Result<usize, OpError> {
        let root = paths::canonical(root).map_err(|e| OpError::io(root, e))?;

        for index in 0..zip.len() {
            self.checkpoint()?;

            let mut entry = zip.by_index(index).map_err(|e| zip_error(archive, e))?;
            let name = entry.name().to_string();
            let target =
                paths::canonical(&root.join(&name)).map_err(|e| OpError::io(root.join(&name), e))?;

            if !paths::is_strictly_within(&target, &root) {
                error!(
                    archive = %archive.display(),
                    entry = %name,
                    "Archive entry is trying to escape the target directory"
                );
                return Err(OpError::PathTraversal { entry: name });
            }

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| OpError::io(&target, e))?;
                continue;
            }

            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir).map_err(|e| OpError::io(dir, e))?;
            }
            let mut output = File::create(&target).map_err(|e| OpError::io(&target, e))?;
            let bytes = self.stream(&mut entry, &mut output, archive, &target)?;
            debug!(entry = %name, bytes, "Extracted entry");
        }

        Ok(zip.len())
    }
}

//! Folder creation.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{OpError, paths};
use tracing::debug;

use crate::engine::{Engine, validate_destination};
use crate::rename::validate_filename;

impl Engine {
    /// Create a folder called `name` inside `parent`.
    ///
    /// Fails if anything already exists under that name.
    pub fn create_folder(&self, parent: &Path, name: &str) -> Result<PathBuf, OpError> {
        validate_filename(name)?;
        validate_destination(parent)?;

        let path = parent.join(name);
        if paths::exists(&path) {
            return Err(OpError::AlreadyExists { path });
        }

        fs::create_dir(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => OpError::AlreadyExists { path: path.clone() },
            _ => OpError::io(&path, e),
        })?;

        debug!(path = %path.display(), "Created folder");
        Ok(path)
    }
}

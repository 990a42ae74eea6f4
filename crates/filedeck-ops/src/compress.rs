//! ZIP archive creation.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use filedeck_core::{OpError, paths};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::engine::{Engine, leaf_name, validate_destination};

/// Entries of at least this size need ZIP64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

impl Engine {
    /// Write every source into a new ZIP file at `archive`.
    ///
    /// See [`Engine::compress_with`].
    pub fn compress(&self, sources: &[PathBuf], archive: &Path) -> Result<usize, OpError> {
        self.compress_with(sources, archive, &mut |_, _, _| {})
    }

    /// Write every source into a new ZIP file at `archive`, reporting each
    /// top-level source through `on_item(source, index, total)` before it is
    /// written.
    ///
    /// Directory sources keep their relative layout under their own name.
    /// Subdirectories that cannot be listed are skipped; any other failure
    /// removes the partial archive. `archive` must not exist yet. Returns the
    /// number of entries written.
    pub fn compress_with(
        &self,
        sources: &[PathBuf],
        archive: &Path,
        on_item: &mut dyn FnMut(&Path, usize, usize),
    ) -> Result<usize, OpError> {
        if sources.is_empty() {
            return Err(OpError::invalid_request("nothing to compress"));
        }
        if let Some(missing) = sources.iter().find(|s| !paths::exists(s)) {
            return Err(OpError::SourceMissing {
                path: missing.clone(),
            });
        }
        if paths::exists(archive) {
            return Err(OpError::AlreadyExists {
                path: archive.to_path_buf(),
            });
        }
        if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
            validate_destination(parent)?;
        }

        let file = File::create(archive).map_err(|e| OpError::io(archive, e))?;
        let mut writer = ArchiveWriter {
            engine: self,
            zip: ZipWriter::new(file),
            archive,
            archive_canonical: paths::canonical(archive).ok(),
            options: SimpleFileOptions::default().compression_method(
                if self.config().deflate {
                    CompressionMethod::Deflated
                } else {
                    CompressionMethod::Stored
                },
            ),
            entries: 0,
        };

        let result = writer.write_sources(sources, on_item);
        let ArchiveWriter { zip, entries, .. } = writer;
        // The writer is closed before any cleanup below.
        let result = result.and_then(|()| zip.finish().map(drop).map_err(|e| zip_error(archive, e)));

        match result {
            Ok(()) => {
                debug!(archive = %archive.display(), entries, "Archive written");
                Ok(entries)
            }
            Err(err) => {
                warn!(archive = %archive.display(), error = %err, "Compression failed, removing archive");
                if let Err(e) = self.discard(archive) {
                    warn!(path = %archive.display(), error = %e, "Failed to remove partial archive");
                }
                Err(err)
            }
        }
    }
}

struct ArchiveWriter<'a> {
    engine: &'a Engine,
    zip: ZipWriter<File>,
    archive: &'a Path,
    archive_canonical: Option<PathBuf>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ArchiveWriter<'_> {
    fn write_sources(
        &mut self,
        sources: &[PathBuf],
        on_item: &mut dyn FnMut(&Path, usize, usize),
    ) -> Result<(), OpError> {
        let total = sources.len();
        for (index, source) in sources.iter().enumerate() {
            on_item(source, index, total);
            let name = leaf_name(source)
                .ok_or_else(|| OpError::invalid_request(format!("{} has no name", source.display())))?;
            self.write_node(source, &name)?;
        }
        Ok(())
    }

    fn write_node(&mut self, path: &Path, name: &str) -> Result<(), OpError> {
        self.engine.checkpoint()?;

        let link = fs::symlink_metadata(path)
            .map_err(|e| OpError::io(path, e))?
            .file_type()
            .is_symlink();
        // A dangling link fails here and takes the archive with it.
        let metadata = fs::metadata(path).map_err(|e| OpError::io(path, e))?;

        if metadata.is_dir() {
            if link {
                warn!(path = %path.display(), "Skipping symlinked directory");
                return Ok(());
            }
            return self.write_dir(path, name);
        }

        let entry = name.trim_start_matches('/');
        let options = self
            .options
            .large_file(metadata.len() >= LARGE_FILE_THRESHOLD);
        self.zip
            .start_file(entry, options)
            .map_err(|e| zip_error(self.archive, e))?;

        let mut input = File::open(path).map_err(|e| OpError::io(path, e))?;
        let bytes = self
            .engine
            .stream(&mut input, &mut self.zip, path, self.archive)?;
        self.entries += 1;
        debug!(entry, bytes, "Added file entry");
        Ok(())
    }

    fn write_dir(&mut self, path: &Path, name: &str) -> Result<(), OpError> {
        // List first so an unreadable directory leaves no entry behind.
        let mut children: Vec<_> = match fs::read_dir(path) {
            Ok(entries) => entries.filter_map(Result::ok).collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable directory");
                return Ok(());
            }
        };
        children.sort_by_key(|entry| entry.file_name());

        let name = name.trim_matches('/');
        self.zip
            .add_directory(format!("{name}/"), self.options)
            .map_err(|e| zip_error(self.archive, e))?;
        self.entries += 1;

        for child in children {
            let child_path = child.path();
            if self.is_archive(&child_path) {
                debug!(path = %child_path.display(), "Skipping the archive being written");
                continue;
            }
            let child_name = format!("{name}/{}", child.file_name().to_string_lossy());
            self.write_node(&child_path, &child_name)?;
        }

        Ok(())
    }

    fn is_archive(&self, path: &Path) -> bool {
        match (&self.archive_canonical, paths::canonical(path)) {
            (Some(archive), Ok(path)) => *archive == path,
            _ => false,
        }
    }
}

/// Attribute a ZIP library failure to `path`.
pub(crate) fn zip_error(path: &Path, err: ZipError) -> OpError {
    match err {
        ZipError::Io(e) => OpError::io(path, e),
        other => OpError::Archive {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

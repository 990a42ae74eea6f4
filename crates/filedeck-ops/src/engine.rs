//! The operation engine shared by every file operation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use filedeck_core::{EngineConfig, OpError, is_writable};
use tokio_util::sync::CancellationToken;

use crate::fs::{Filesystem, StdFilesystem};

/// Runs file operations synchronously on the calling thread.
///
/// The engine is cheap to clone. Every clone shares configuration and the
/// [`Filesystem`] backend; [`Engine::with_cancellation`] derives a clone
/// bound to one operation's cancellation token.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    fs: Arc<dyn Filesystem>,
    cancel: CancellationToken,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine backed by the real filesystem.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            fs: Arc::new(StdFilesystem),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the filesystem backend.
    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Derive an engine whose operations stop once `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            config: Arc::clone(&self.config),
            fs: Arc::clone(&self.fs),
            cancel: token,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// Fail with [`OpError::Cancelled`] if this engine's token was cancelled.
    pub(crate) fn checkpoint(&self) -> Result<(), OpError> {
        if self.cancel.is_cancelled() {
            Err(OpError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Copy `reader` into `writer` through a fixed-size buffer.
    ///
    /// Read errors are attributed to `from`, write errors to `to`.
    pub(crate) fn stream(
        &self,
        reader: &mut impl Read,
        writer: &mut impl Write,
        from: &Path,
        to: &Path,
    ) -> Result<u64, OpError> {
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];
        let mut total = 0u64;

        loop {
            self.checkpoint()?;
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(OpError::io(from, e)),
            };
            writer
                .write_all(&buffer[..read])
                .map_err(|e| OpError::io(to, e))?;
            total += read as u64;
        }

        writer.flush().map_err(|e| OpError::io(to, e))?;
        Ok(total)
    }
}

/// Check that `dir` exists, is a directory, and is writable.
pub(crate) fn validate_destination(dir: &Path) -> Result<(), OpError> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(OpError::invalid_destination(dir, "not a directory")),
        Err(_) => return Err(OpError::invalid_destination(dir, "does not exist")),
    }

    if !is_writable(dir) {
        return Err(OpError::NotWritable {
            path: dir.to_path_buf(),
        });
    }

    Ok(())
}

/// Leaf name of `path` as a string, if it has one.
pub(crate) fn leaf_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

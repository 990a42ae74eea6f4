//! Transient views of filesystem nodes.
//!
//! A [`FileNode`] is a snapshot taken at the moment of a probe. Operations
//! never hold on to one across steps: every check re-queries the filesystem.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Type of file system node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink {
        /// Whether the link resolves to a directory.
        target_is_dir: bool,
        /// Whether the link target does not exist.
        broken: bool,
    },
    /// Other file types (sockets, devices, etc.).
    Other,
    /// Nothing exists at the path.
    Missing,
}

impl NodeKind {
    fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            match fs::metadata(path) {
                Ok(target) => NodeKind::Symlink {
                    target_is_dir: target.is_dir(),
                    broken: false,
                },
                Err(_) => NodeKind::Symlink {
                    target_is_dir: false,
                    broken: true,
                },
            }
        } else if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        }
    }

    /// Check if this is a directory, following symlinks.
    pub fn is_dir(&self) -> bool {
        matches!(
            self,
            NodeKind::Directory
                | NodeKind::Symlink {
                    target_is_dir: true,
                    ..
                }
        )
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, NodeKind::Symlink { .. })
    }
}

/// A snapshot of one file or directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    /// Absolute (or caller-supplied) path of the node.
    pub path: PathBuf,

    /// Leaf name, empty for filesystem roots.
    pub name: String,

    /// Node type.
    pub kind: NodeKind,

    /// Whether the current process may read the node.
    pub readable: bool,

    /// Whether the current process may write the node.
    pub writable: bool,

    /// Size in bytes (link size for symlinks, zero for missing nodes).
    pub size: u64,

    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
}

impl FileNode {
    /// Probe the filesystem for `path`.
    ///
    /// Never fails: a node that cannot be stat'ed is reported as
    /// [`NodeKind::Missing`].
    pub fn probe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match fs::symlink_metadata(&path) {
            Ok(metadata) => {
                let kind = NodeKind::from_metadata(&path, &metadata);
                Self {
                    readable: is_readable(&path),
                    writable: is_writable(&path),
                    size: metadata.len(),
                    modified: metadata.modified().ok(),
                    path,
                    name,
                    kind,
                }
            }
            Err(_) => Self {
                path,
                name,
                kind: NodeKind::Missing,
                readable: false,
                writable: false,
                size: 0,
                modified: None,
            },
        }
    }

    /// Check if anything exists at this path (a dangling symlink counts).
    pub fn exists(&self) -> bool {
        self.kind != NodeKind::Missing
    }

    /// Check if this node is a directory, following symlinks.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this node is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }
}

/// Check whether the current process may read `path`.
#[cfg(unix)]
pub fn is_readable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::READ_OK).is_ok()
}

/// Check whether the current process may read `path`.
#[cfg(not(unix))]
pub fn is_readable(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Check whether the current process may write `path`.
#[cfg(unix)]
pub fn is_writable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::WRITE_OK).is_ok()
}

/// Check whether the current process may write `path`.
#[cfg(not(unix))]
pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

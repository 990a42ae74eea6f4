//! File operation requests.

use std::fmt;
use std::path::{Path, PathBuf};

use filedeck_core::{OpError, paths};
use serde::{Deserialize, Serialize};

use crate::engine::validate_destination;
use crate::rename::validate_filename;

/// The kind of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
    Compress,
    Extract,
    Rename,
    CreateFolder,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Delete => write!(f, "Delete"),
            Self::Compress => write!(f, "Compress"),
            Self::Extract => write!(f, "Extract"),
            Self::Rename => write!(f, "Rename"),
            Self::CreateFolder => write!(f, "Create folder"),
        }
    }
}

/// A file operation to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperationRequest {
    /// Copy files/directories into a destination directory.
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Move files/directories into a destination directory.
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Delete files/directories.
    Delete { sources: Vec<PathBuf> },
    /// Compress sources into one ZIP file inside a destination directory.
    Compress {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Extract a ZIP file, next to it unless a destination is given.
    Extract {
        archive: PathBuf,
        destination: Option<PathBuf>,
    },
    /// Rename a single file or directory.
    Rename { source: PathBuf, new_name: String },
    /// Create a new folder.
    CreateFolder { parent: PathBuf, name: String },
}

impl OperationRequest {
    /// Create a copy request.
    pub fn copy(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Copy {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a move request.
    pub fn move_to(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a delete request.
    pub fn delete(sources: Vec<PathBuf>) -> Self {
        Self::Delete { sources }
    }

    /// Create a compress request.
    pub fn compress(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Compress {
            sources,
            destination: destination.into(),
        }
    }

    /// Create an extract request.
    pub fn extract(archive: impl Into<PathBuf>, destination: Option<PathBuf>) -> Self {
        Self::Extract {
            archive: archive.into(),
            destination,
        }
    }

    /// Create a rename request.
    pub fn rename(source: impl Into<PathBuf>, new_name: impl Into<String>) -> Self {
        Self::Rename {
            source: source.into(),
            new_name: new_name.into(),
        }
    }

    /// Create a folder creation request.
    pub fn create_folder(parent: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::CreateFolder {
            parent: parent.into(),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Copy { .. } => OperationKind::Copy,
            Self::Move { .. } => OperationKind::Move,
            Self::Delete { .. } => OperationKind::Delete,
            Self::Compress { .. } => OperationKind::Compress,
            Self::Extract { .. } => OperationKind::Extract,
            Self::Rename { .. } => OperationKind::Rename,
            Self::CreateFolder { .. } => OperationKind::CreateFolder,
        }
    }

    /// Number of progress units the request reports.
    ///
    /// A compress request produces one archive and counts as one unit.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Copy { sources, .. } | Self::Move { sources, .. } | Self::Delete { sources } => {
                sources.len()
            }
            Self::Compress { .. }
            | Self::Extract { .. }
            | Self::Rename { .. }
            | Self::CreateFolder { .. } => 1,
        }
    }

    /// Directory whose listing changes when the request succeeds.
    pub fn affected_directory(&self) -> Option<PathBuf> {
        match self {
            Self::Copy { destination, .. }
            | Self::Move { destination, .. }
            | Self::Compress { destination, .. } => Some(destination.clone()),
            Self::Delete { sources } => sources.first().and_then(|s| parent_of(s)),
            Self::Extract {
                archive,
                destination,
            } => destination.clone().or_else(|| parent_of(archive)),
            Self::Rename { source, .. } => parent_of(source),
            Self::CreateFolder { parent, .. } => Some(parent.clone()),
        }
    }

    /// Check the request shape and the destination as they are right now.
    ///
    /// Destinations are checked again when the request runs.
    pub fn validate(&self) -> Result<(), OpError> {
        match self {
            Self::Copy {
                sources,
                destination,
            }
            | Self::Move {
                sources,
                destination,
            }
            | Self::Compress {
                sources,
                destination,
            } => {
                require_sources(sources)?;
                validate_destination(destination)
            }
            Self::Delete { sources } => require_sources(sources),
            Self::Extract {
                archive,
                destination,
            } => {
                if !paths::exists(archive) {
                    return Err(OpError::SourceMissing {
                        path: archive.clone(),
                    });
                }
                match destination {
                    Some(dir) => validate_destination(dir),
                    None => Ok(()),
                }
            }
            Self::Rename { source, new_name } => {
                validate_filename(new_name)?;
                if paths::exists(source) {
                    Ok(())
                } else {
                    Err(OpError::SourceMissing {
                        path: source.clone(),
                    })
                }
            }
            Self::CreateFolder { parent, name } => {
                validate_filename(name)?;
                validate_destination(parent)
            }
        }
    }
}

fn require_sources(sources: &[PathBuf]) -> Result<(), OpError> {
    if sources.is_empty() {
        return Err(OpError::invalid_request("no sources given"));
    }
    Ok(())
}

fn parent_of(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

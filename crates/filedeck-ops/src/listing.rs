//! Directory listing and refresh decisions.

use std::fs;
use std::path::Path;

use filedeck_core::{FileNode, OpError, paths};
use tracing::warn;

/// List the children of `dir`, directories first, then by name ignoring case.
///
/// Children that vanish between listing and probing are still returned,
/// as [`filedeck_core::NodeKind::Missing`] nodes.
pub fn list_directory(dir: &Path) -> Result<Vec<FileNode>, OpError> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(OpError::invalid_request(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Err(e) => return Err(OpError::io(dir, e)),
    }

    let entries = fs::read_dir(dir).map_err(|e| OpError::io(dir, e))?;

    let mut nodes: Vec<FileNode> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(FileNode::probe(entry.path())),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                None
            }
        })
        .collect();

    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    Ok(nodes)
}

/// Whether a view of `current` must reload after a change in `affected`.
///
/// True when they are the same directory or `affected` contains `current`.
pub fn needs_refresh(current: &Path, affected: &Path) -> bool {
    paths::same_node(current, affected) || paths::is_nested_under(current, affected)
}

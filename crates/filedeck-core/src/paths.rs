//! Path helpers used for nesting and traversal checks.
//!
//! `fs::canonicalize` only works on paths that exist, while the engine has
//! to compare destinations that have not been created yet. [`canonical`]
//! resolves the longest existing ancestor through the filesystem and appends
//! the remaining components after lexical normalization.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Check whether anything exists at `path` without following a final symlink.
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// `..` never climbs above a root; on relative paths leading `..`
/// components are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_parent =
                    matches!(out.components().next_back(), Some(Component::ParentDir));
                if ends_in_parent || (!out.has_root() && out.as_os_str().is_empty()) {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Resolve `path` to its canonical form, even if it does not exist yet.
pub fn canonical(path: &Path) -> io::Result<PathBuf> {
    let normalized = normalize(&std::path::absolute(path)?);
    let mut base = normalized.as_path();
    let mut rest: Vec<OsString> = Vec::new();

    loop {
        match fs::canonicalize(base) {
            Ok(resolved) => {
                let mut out = resolved;
                for name in rest.iter().rev() {
                    out.push(name);
                }
                return Ok(out);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (base.parent(), base.file_name()) else {
                    return Err(err);
                };
                rest.push(name.to_os_string());
                base = parent;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Check whether `path` lies strictly below `ancestor`.
///
/// Both arguments are compared component-wise, so `/a/bc` is not inside
/// `/a/b`. Callers pass canonical paths.
pub fn is_strictly_within(path: &Path, ancestor: &Path) -> bool {
    path != ancestor && path.starts_with(ancestor)
}

/// Check whether two paths name the same node once canonicalized.
///
/// Resolution failures count as "not the same".
pub fn same_node(a: &Path, b: &Path) -> bool {
    match (canonical(a), canonical(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Check whether `descendant` would be placed inside the directory `dir`.
pub fn is_nested_under(descendant: &Path, dir: &Path) -> bool {
    match (canonical(descendant), canonical(dir)) {
        (Ok(descendant), Ok(dir)) => is_strictly_within(&descendant, &dir),
        _ => false,
    }
}

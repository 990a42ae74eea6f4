//! Name conflict resolution for generated destinations.

use std::path::{Path, PathBuf};

use filedeck_core::paths;
use tracing::debug;

/// Produce a path that does not exist yet.
///
/// Returns `candidate` unchanged when nothing exists there. Otherwise tries
/// "name (1).ext", "name (2).ext", ... until a free name is found.
/// Directories, extension-less names and dot-files keep the whole leaf as
/// the base, so "photos" becomes "photos (1)" and ".env" becomes ".env (1)".
pub fn resolve(candidate: &Path) -> PathBuf {
    if !paths::exists(candidate) {
        return candidate.to_path_buf();
    }

    let parent = candidate.parent().unwrap_or(Path::new(""));
    let name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (base, extension) = if candidate.is_dir() {
        (name.as_str(), "")
    } else {
        split_extension(&name)
    };

    let mut counter: u64 = 1;
    loop {
        let unique = parent.join(format!("{base} ({counter}){extension}"));
        if !paths::exists(&unique) {
            debug!(
                original = %candidate.display(),
                resolved = %unique.display(),
                "Name conflict resolved"
            );
            return unique;
        }
        counter += 1;
    }
}

/// Split "archive.tar.gz" into ("archive.tar", ".gz").
///
/// A dot at position zero does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_resolve_free_path_unchanged() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test.txt");
        assert_eq!(resolve(&path), path);
    }

    #[test]
    fn test_resolve_sequence_has_no_gaps() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("test.txt");

        let mut produced = Vec::new();
        for _ in 0..4 {
            let next = resolve(&path);
            fs::write(&next, b"").unwrap();
            produced.push(next.file_name().unwrap().to_string_lossy().into_owned());
        }

        assert_eq!(
            produced,
            ["test.txt", "test (1).txt", "test (2).txt", "test (3).txt"]
        );
    }

    #[test]
    fn test_resolve_directory_keeps_whole_name() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("photos.2024");
        fs::create_dir(&dir).unwrap();

        assert_eq!(resolve(&dir), temp.path().join("photos.2024 (1)"));
    }

    #[test]
    fn test_resolve_no_extension_and_dotfile() {
        let temp = tempfile::tempdir().unwrap();
        let plain = temp.path().join("testfile");
        let dotfile = temp.path().join(".env");
        fs::write(&plain, b"").unwrap();
        fs::write(&dotfile, b"").unwrap();

        assert_eq!(resolve(&plain), temp.path().join("testfile (1)"));
        assert_eq!(resolve(&dotfile), temp.path().join(".env (1)"));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
    }
}

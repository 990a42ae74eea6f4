//! Default names for generated archives and extraction directories.

use std::path::{Path, PathBuf};

use filedeck_core::paths;

use crate::engine::leaf_name;

/// Default archive file name for a set of sources.
///
/// One source gives "name.zip"; more give "name_and_N_more.zip" where
/// "name" is the first source's leaf. Returns `None` for an empty list.
pub fn archive_name(sources: &[PathBuf]) -> Option<String> {
    let first = leaf_name(sources.first()?)?;
    Some(match sources.len() {
        1 => format!("{first}.zip"),
        n => format!("{first}_and_{}_more.zip", n - 1),
    })
}

/// Archive file name without its final extension.
///
/// "photos.zip" gives "photos", "backup.tar.zip" gives "backup.tar", and a
/// leading dot is part of the name.
pub fn archive_base_name(archive: &Path) -> String {
    let name = leaf_name(archive).unwrap_or_default();
    match name.rfind('.') {
        Some(index) if index > 0 => name[..index].to_string(),
        _ => name,
    }
}

/// First free "<base><suffix>" or "<base><suffix>_N" directory in `parent`.
pub fn extraction_dir(parent: &Path, base: &str, suffix: &str) -> PathBuf {
    let candidate = parent.join(format!("{base}{suffix}"));
    if !paths::exists(&candidate) {
        return candidate;
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = parent.join(format!("{base}{suffix}_{counter}"));
        if !paths::exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(&[]), None);
        assert_eq!(
            archive_name(&[PathBuf::from("/data/src")]),
            Some("src.zip".to_string())
        );
        assert_eq!(
            archive_name(&[
                PathBuf::from("/data/report.pdf"),
                PathBuf::from("/data/a"),
                PathBuf::from("/data/b"),
            ]),
            Some("report.pdf_and_2_more.zip".to_string())
        );
    }

    #[test]
    fn test_archive_base_name() {
        assert_eq!(archive_base_name(Path::new("/x/out.zip")), "out");
        assert_eq!(archive_base_name(Path::new("/x/a.tar.zip")), "a.tar");
        assert_eq!(archive_base_name(Path::new("/x/.zip")), ".zip");
        assert_eq!(archive_base_name(Path::new("/x/plain")), "plain");
    }

    #[test]
    fn test_extraction_dir_counts_up() {
        let temp = tempfile::tempdir().unwrap();

        let first = extraction_dir(temp.path(), "out", "_extracted");
        assert_eq!(first, temp.path().join("out_extracted"));
        fs::create_dir(&first).unwrap();

        let second = extraction_dir(temp.path(), "out", "_extracted");
        assert_eq!(second, temp.path().join("out_extracted_1"));
        fs::create_dir(&second).unwrap();

        assert_eq!(
            extraction_dir(temp.path(), "out", "_extracted"),
            temp.path().join("out_extracted_2")
        );
    }
}

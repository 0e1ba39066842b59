//! Label directory discovery.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Discover the label directories under a dataset root.
///
/// Returns the names of the immediate subdirectories of `root`, sorted
/// lexicographically. The position of a name in the returned list is its
/// label index. Hidden directories count as labels like any other, and a
/// name that is not valid UTF-8 is an error rather than a gap in the
/// indices.
pub fn discover_labels(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Err(Error::Dataset(format!("Path does not exist: {}", root.display())));
    }

    if !root.is_dir() {
        return Err(Error::Dataset(format!("Path is not a directory: {}", root.display())));
    }

    let entries = fs::read_dir(root).map_err(|e| {
        Error::Dataset(format!("Failed to read directory {}: {}", root.display(), e))
    })?;

    let mut labels = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::Dataset(format!("Failed to read entry in {}: {}", root.display(), e))
        })?;

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            return Err(Error::Dataset(format!(
                "Label directory name is not valid UTF-8: {}",
                path.display()
            )));
        };

        labels.push(name.to_string());
    }

    if labels.is_empty() {
        return Err(Error::NoLabels(root.to_path_buf()));
    }

    labels.sort();
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["J", "A", "C", "B"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README.txt"), b"not a label").unwrap();

        let labels = discover_labels(dir.path()).unwrap();
        assert_eq!(labels, vec!["A", "B", "C", "J"]);
    }

    #[test]
    fn test_hidden_directories_are_labels() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::create_dir(dir.path().join("0")).unwrap();
        fs::create_dir(dir.path().join("1")).unwrap();

        assert_eq!(discover_labels(dir.path()).unwrap(), vec![".git", "0", "1"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("0")).unwrap();
        let bad = dir.path().join(OsStr::from_bytes(b"lab\xffel"));
        if fs::create_dir(&bad).is_err() {
            // Filesystems that enforce UTF-8 names cannot hold this tree.
            return;
        }

        let err = discover_labels(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_no_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();

        let err = discover_labels(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoLabels(_)));
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_labels(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }
}

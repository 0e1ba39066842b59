//! Per-label file listing and sampling.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::index;

use crate::error::{Error, Result};

/// Candidate files of one label directory.
#[derive(Debug, Clone, Default)]
pub struct LabelFiles {
    /// Non-empty files with an accepted extension, sorted.
    pub paths: Vec<PathBuf>,
    /// Zero-byte files that were skipped.
    pub empty: Vec<PathBuf>,
}

/// List the image files of a label directory.
///
/// Only regular files whose name ends in `.<ext>` for one of `extensions`
/// are considered; a file named exactly `.png` counts as a PNG.
/// Zero-byte files are logged and reported in [`LabelFiles::empty`]. The
/// result is sorted so sampling does not depend on the order the OS returns
/// directory entries in.
pub fn list_label_files(dir: &Path, extensions: &[impl AsRef<str>]) -> Result<LabelFiles> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::Dataset(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut files = LabelFiles::default();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::Dataset(format!("Failed to read entry in {}: {}", dir.display(), e))
        })?;
        let path = entry.path();

        let accepted = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| has_extension(name, extensions));
        if !accepted {
            continue;
        }

        let metadata = fs::metadata(&path)?;
        if !metadata.is_file() {
            continue;
        }

        if metadata.len() == 0 {
            log::warn!("File {} is empty, skipping", path.display());
            files.empty.push(path);
        } else {
            files.paths.push(path);
        }
    }

    files.paths.sort();
    files.empty.sort();
    Ok(files)
}

fn has_extension(name: &str, extensions: &[impl AsRef<str>]) -> bool {
    extensions.iter().any(|ext| {
        name.strip_suffix(ext.as_ref())
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Draw `per_label` distinct files uniformly at random.
///
/// `None` or `Some(0)` returns every file, in random order. Asking for more
/// files than exist fails with [`Error::InsufficientFiles`].
pub fn sample_files<R: Rng + ?Sized>(
    label: &str,
    files: &[PathBuf],
    per_label: Option<usize>,
    rng: &mut R,
) -> Result<Vec<PathBuf>> {
    let requested = per_label.filter(|&n| n > 0).unwrap_or(files.len());
    if requested > files.len() {
        return Err(Error::InsufficientFiles {
            label: label.to_string(),
            requested,
            available: files.len(),
        });
    }

    Ok(index::sample(rng, files.len(), requested)
        .into_iter()
        .map(|i| files[i].clone())
        .collect())
}

//! Labeled image folders.
//!
//! A dataset root holds one subdirectory per class label. Labels are indexed
//! by the sorted order of their directory names, and each label directory is
//! sampled independently before the pool is shuffled.
//!
//! ## Example
//!
//! ```rust,ignore
//! use idx_convert::dataset::SampleSet;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let set = SampleSet::collect("./notMNIST_small", Some(1000), &["png"], &mut rng)?;
//! println!("{} labels, {} samples", set.labels.len(), set.len());
//! ```

mod discovery;
mod sampler;

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use discovery::discover_labels;
pub use sampler::{list_label_files, sample_files, LabelFiles};

use crate::error::{Error, Result};

/// Largest number of labels a one-byte label file can index.
pub const MAX_LABELS: usize = 256;

/// A labeled image file selected for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Label index (position of the label directory in sorted order).
    pub label: u8,
    /// Path to the image file.
    pub path: PathBuf,
}

/// Per-label sampling statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Label directory name.
    pub name: String,
    /// Label index.
    pub index: u8,
    /// Non-empty candidate files.
    pub available: usize,
    /// Zero-byte files that were skipped.
    pub empty: usize,
    /// Files drawn for conversion.
    pub sampled: usize,
}

/// The sampled files of every label, grouped by label in label order.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// Label directory names; the position is the label index.
    pub labels: Vec<String>,
    /// Selected samples.
    pub samples: Vec<Sample>,
    /// Sampling statistics per label.
    pub stats: Vec<LabelStats>,
}

impl SampleSet {
    /// Scan `root` for labels and draw up to `per_label` files from each.
    ///
    /// `None` or `Some(0)` takes every usable file of a label.
    pub fn collect<R: Rng + ?Sized>(
        root: impl AsRef<Path>,
        per_label: Option<usize>,
        extensions: &[impl AsRef<str>],
        rng: &mut R,
    ) -> Result<Self> {
        let root = root.as_ref();
        let labels = discover_labels(root)?;
        if labels.len() > MAX_LABELS {
            return Err(Error::TooManyLabels(labels.len()));
        }

        let mut samples = Vec::new();
        let mut stats = Vec::with_capacity(labels.len());

        for (index, name) in labels.iter().enumerate() {
            let index = index as u8;
            let files = list_label_files(&root.join(name), extensions)?;
            let picked = sample_files(name, &files.paths, per_label, rng)?;

            stats.push(LabelStats {
                name: name.clone(),
                index,
                available: files.paths.len(),
                empty: files.empty.len(),
                sampled: picked.len(),
            });
            samples.extend(picked.into_iter().map(|path| Sample { label: index, path }));
        }

        log::info!(
            "Sampled {} files across {} labels in {}",
            samples.len(),
            labels.len(),
            root.display()
        );

        Ok(Self { labels, samples, stats })
    }

    /// Number of selected samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no samples were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the set, keeping only the samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fs;

    fn touch(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_collect_groups_by_label() {
        let dir = tempfile::tempdir().unwrap();
        for label in ["B", "A"] {
            for i in 0..3 {
                touch(&dir.path().join(label).join(format!("{i}.png")), b"x");
            }
        }

        let mut rng = StdRng::seed_from_u64(7);
        let set = SampleSet::collect(dir.path(), Some(2), &["png"], &mut rng).unwrap();

        assert_eq!(set.labels, vec!["A", "B"]);
        assert_eq!(set.len(), 4);
        let labels: Vec<u8> = set.samples.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![0, 0, 1, 1]);
        assert!(set.samples[..2].iter().all(|s| s.path.starts_with(dir.path().join("A"))));
        assert_eq!(set.stats[1].available, 3);
        assert_eq!(set.stats[1].sampled, 2);
    }

    #[test]
    fn test_collect_counts_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/full.png"), b"x");
        touch(&dir.path().join("a/empty.png"), b"");

        let mut rng = StdRng::seed_from_u64(1);
        let set = SampleSet::collect(dir.path(), None, &["png"], &mut rng).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.stats[0].empty, 1);
        assert_eq!(set.stats[0].available, 1);
    }

    #[test]
    fn test_collect_rejects_too_many_labels() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..=MAX_LABELS {
            fs::create_dir(dir.path().join(format!("{i:03}"))).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(1);
        let err = SampleSet::collect(dir.path(), None, &["png"], &mut rng).unwrap_err();
        assert!(matches!(err, Error::TooManyLabels(257)));
    }
}

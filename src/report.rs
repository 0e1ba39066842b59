//! Conversion run reports.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checksum::checksum_file;
use crate::dataset::LabelStats;
use crate::error::Result;
use crate::idx::IdxPair;
use crate::materialize::{ImageShape, ShapePolicy, SkippedFile};
use crate::split::SplitMode;

/// A file written by a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    /// Output path.
    pub path: PathBuf,
    /// File size in bytes.
    pub bytes: u64,
    /// FNV-1a checksum of the contents.
    pub checksum: String,
}

impl WrittenFile {
    /// Describe a file that has just been written.
    pub fn inspect(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            bytes: std::fs::metadata(path)?.len(),
            checksum: checksum_file(path)?,
        })
    }
}

/// One written partition (train or test).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Samples in the partition.
    pub count: usize,
    /// Image file.
    pub images: WrittenFile,
    /// Label file.
    pub labels: WrittenFile,
}

impl PartitionReport {
    /// Describe a partition whose files have just been written.
    pub fn inspect(pair: &IdxPair, count: usize) -> Result<Self> {
        Ok(Self {
            count,
            images: WrittenFile::inspect(&pair.images)?,
            labels: WrittenFile::inspect(&pair.labels)?,
        })
    }

    /// The file pair of this partition.
    #[must_use]
    pub fn pair(&self) -> IdxPair {
        IdxPair {
            images: self.images.path.clone(),
            labels: self.labels.path.clone(),
        }
    }
}

/// Summary of a conversion run.
///
/// Saved as JSON next to the outputs it can be used to check that a
/// regenerated dataset matches: same seed, same tree, same checksums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Dataset root.
    pub root: PathBuf,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Split mode of the run.
    pub mode: SplitMode,
    /// Per-label cap, `None` for all files.
    pub per_label: Option<usize>,
    /// Seed of the run RNG.
    pub seed: u64,
    /// Shape mismatch policy.
    pub shape_policy: ShapePolicy,
    /// Sampling statistics, in label order.
    pub labels: Vec<LabelStats>,
    /// Samples drawn before decoding.
    pub sampled: usize,
    /// Samples decoded successfully.
    pub materialized: usize,
    /// Shape of every image, `None` if nothing decoded.
    pub shape: Option<ImageShape>,
    /// Samples dropped during decoding.
    #[serde(default)]
    pub skipped: Vec<SkippedFile>,
    /// Training files, if written.
    pub train: Option<PartitionReport>,
    /// Test files, if written.
    pub test: Option<PartitionReport>,
}

impl ConversionReport {
    /// Samples in the training partition.
    #[must_use]
    pub fn train_count(&self) -> usize {
        self.train.as_ref().map_or(0, |p| p.count)
    }

    /// Samples in the test partition.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.test.as_ref().map_or(0, |p| p.count)
    }

    /// All files written by the run.
    pub fn files(&self) -> impl Iterator<Item = &WrittenFile> {
        [&self.train, &self.test]
            .into_iter()
            .flatten()
            .flat_map(|p| [&p.labels, &p.images])
    }

    /// Load a report from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let report: ConversionReport = serde_json::from_str(&content)?;
        Ok(report)
    }

    /// Save the report to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(name: &str) -> WrittenFile {
        WrittenFile {
            path: PathBuf::from(name),
            bytes: 8,
            checksum: "0000000000000000".to_string(),
        }
    }

    fn report() -> ConversionReport {
        ConversionReport {
            root: PathBuf::from("notMNIST_small"),
            output_dir: PathBuf::from("convert_MNIST"),
            mode: SplitMode::Percent(30.0),
            per_label: Some(5),
            seed: 42,
            shape_policy: ShapePolicy::Fail,
            labels: Vec::new(),
            sampled: 10,
            materialized: 10,
            shape: Some(ImageShape::new(28, 28, 1)),
            skipped: Vec::new(),
            train: Some(PartitionReport {
                count: 7,
                images: written("train-images-idx3-ubyte"),
                labels: written("train-labels-idx1-ubyte"),
            }),
            test: Some(PartitionReport {
                count: 3,
                images: written("t10k-images-idx3-ubyte"),
                labels: written("t10k-labels-idx1-ubyte"),
            }),
        }
    }

    #[test]
    fn test_counts_and_files() {
        let mut report = report();
        assert_eq!(report.train_count(), 7);
        assert_eq!(report.test_count(), 3);
        assert_eq!(report.files().count(), 4);

        report.test = None;
        assert_eq!(report.test_count(), 0);
        assert_eq!(report.files().count(), 2);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        report().save(&path).unwrap();
        let loaded = ConversionReport::load(&path).unwrap();

        assert_eq!(loaded.mode, SplitMode::Percent(30.0));
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.shape, Some(ImageShape::new(28, 28, 1)));
        assert_eq!(loaded.train, report().train);
    }

    #[test]
    fn test_inspect_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"a").unwrap();

        let file = WrittenFile::inspect(&path).unwrap();
        assert_eq!(file.bytes, 1);
        assert_eq!(file.checksum, "af63dc4c8601ec8c");
    }
}

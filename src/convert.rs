//! End-to-end conversion of a label tree into IDX files.
//!
//! [`Converter`] runs the whole pipeline: scan labels, sample files, shuffle,
//! decode, split and write. One [`StdRng`] drives both sampling and
//! shuffling, so a fixed seed reproduces a run byte for byte.

use std::fs;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::checksum::checksum_file;
use crate::dataset::SampleSet;
use crate::error::{Error, Result};
use crate::idx::{self, DEFAULT_OUTPUT_DIR, OutputPaths};
use crate::materialize::{ImageCrateDecoder, ImageDecoder, ShapePolicy, materialize};
use crate::report::{ConversionReport, PartitionReport};
use crate::split::{self, SplitMode};

/// Configuration for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory holding one subdirectory per label.
    pub root: PathBuf,

    /// Directory the IDX files are written to.
    pub output_dir: PathBuf,

    /// Train/test split.
    pub mode: SplitMode,

    /// Files drawn per label; `None` or `Some(0)` takes all.
    pub per_label: Option<usize>,

    /// RNG seed; `None` draws one from system entropy.
    pub seed: Option<u64>,

    /// Accepted file extensions, without the dot.
    pub extensions: Vec<String>,

    /// Handling of images whose shape differs from the first one.
    pub shape_policy: ShapePolicy,
}

impl ConvertConfig {
    /// Create a new configuration builder for the given dataset root.
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            root: root.into(),
            ..ConvertConfigBuilder::default()
        }
    }

    /// Output file locations for this configuration.
    #[must_use]
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::new(&self.output_dir)
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug, Default)]
pub struct ConvertConfigBuilder {
    root: PathBuf,
    output_dir: Option<PathBuf>,
    mode: Option<SplitMode>,
    per_label: Option<usize>,
    seed: Option<u64>,
    extensions: Option<Vec<String>>,
    shape_policy: Option<ShapePolicy>,
}

impl ConvertConfigBuilder {
    /// Set the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the split mode.
    #[must_use]
    pub fn mode(mut self, mode: SplitMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the number of files drawn per label.
    #[must_use]
    pub fn per_label(mut self, count: Option<usize>) -> Self {
        self.per_label = count;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set the accepted file extensions.
    #[must_use]
    pub fn extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Set the shape mismatch policy.
    #[must_use]
    pub fn shape_policy(mut self, policy: ShapePolicy) -> Self {
        self.shape_policy = Some(policy);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ConvertConfig {
        ConvertConfig {
            root: self.root,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            mode: self.mode.unwrap_or_default(),
            per_label: self.per_label.filter(|&n| n > 0),
            seed: self.seed,
            extensions: self.extensions.unwrap_or_else(|| vec!["png".to_string()]),
            shape_policy: self.shape_policy.unwrap_or_default(),
        }
    }
}

/// Runs conversions.
///
/// # Example
///
/// ```rust,ignore
/// use idx_convert::{ConvertConfig, Converter, SplitMode};
///
/// let config = ConvertConfig::builder("notMNIST_large")
///     .mode(SplitMode::Percent(10.0))
///     .per_label(Some(6000))
///     .seed(Some(42))
///     .build();
///
/// let report = Converter::new(config).run()?;
/// println!("{} train / {} test", report.train_count(), report.test_count());
/// ```
pub struct Converter {
    config: ConvertConfig,
    decoder: Box<dyn ImageDecoder>,
}

impl Converter {
    /// Create a converter that decodes with the `image` crate.
    #[must_use]
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            decoder: Box::new(ImageCrateDecoder),
        }
    }

    /// Replace the image decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Run the conversion and write the IDX files for the configured mode.
    pub fn run(&self) -> Result<ConversionReport> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        log::info!(
            "Converting {} (mode {}, seed {seed})",
            config.root.display(),
            config.mode
        );

        let set = SampleSet::collect(&config.root, config.per_label, &config.extensions, &mut rng)?;
        let stats = set.stats.clone();
        let mut samples = set.into_samples();
        split::shuffle(&mut samples, &mut rng);
        let sampled = samples.len();

        let mut materialized = materialize(samples, self.decoder.as_ref(), config.shape_policy)?;
        if materialized.is_empty() {
            log::warn!("No images could be decoded, writing empty IDX files");
        }
        let shape = materialized.shape;
        let skipped = std::mem::take(&mut materialized.skipped);
        let count = materialized.len();
        let split = materialized.split(config.mode);

        fs::create_dir_all(&config.output_dir)?;
        let paths = config.output_paths();

        let train = if config.mode.writes_train() {
            idx::write_pair(&paths.train, &split.train)?;
            Some(PartitionReport::inspect(&paths.train, split.train.len())?)
        } else {
            None
        };

        let test = if config.mode.writes_test() {
            idx::write_pair(&paths.test, &split.test)?;
            Some(PartitionReport::inspect(&paths.test, split.test.len())?)
        } else {
            None
        };

        Ok(ConversionReport {
            root: config.root.clone(),
            output_dir: config.output_dir.clone(),
            mode: config.mode,
            per_label: config.per_label,
            seed,
            shape_policy: config.shape_policy,
            labels: stats,
            sampled,
            materialized: count,
            shape,
            skipped,
            train,
            test,
        })
    }
}

/// Read back every file listed in `report` and check it against the report.
///
/// Verifies headers, payload lengths, sample counts, image shape and
/// checksums.
pub fn verify(report: &ConversionReport) -> Result<()> {
    for partition in [&report.train, &report.test].into_iter().flatten() {
        let dataset = idx::read_pair(&partition.pair())?;

        if dataset.len() != partition.count {
            return Err(Error::Dataset(format!(
                "{} holds {} samples, expected {}",
                partition.labels.path.display(),
                dataset.len(),
                partition.count
            )));
        }

        if let Some(shape) = report.shape {
            if !dataset.is_empty() && dataset.shape != shape {
                return Err(Error::Dataset(format!(
                    "{} has shape {}, expected {shape}",
                    partition.images.path.display(),
                    dataset.shape
                )));
            }
        }

        for file in [&partition.labels, &partition.images] {
            let checksum = checksum_file(&file.path)?;
            if checksum != file.checksum {
                return Err(Error::Dataset(format!(
                    "{} checksum {checksum} does not match {}",
                    file.path.display(),
                    file.checksum
                )));
            }
        }
    }

    log::info!("Verified {} files", report.files().count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConvertConfig::builder("data").build();
        assert_eq!(config.root, PathBuf::from("data"));
        assert_eq!(config.output_dir, PathBuf::from("convert_MNIST"));
        assert_eq!(config.mode, SplitMode::Train);
        assert_eq!(config.per_label, None);
        assert_eq!(config.seed, None);
        assert_eq!(config.extensions, vec!["png"]);
        assert_eq!(config.shape_policy, ShapePolicy::Fail);
    }

    #[test]
    fn test_builder_zero_per_label_means_all() {
        let config = ConvertConfig::builder("data").per_label(Some(0)).build();
        assert_eq!(config.per_label, None);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConvertConfig::builder("data")
            .output_dir("out")
            .mode(SplitMode::Test)
            .per_label(Some(10))
            .seed(Some(7))
            .extensions(["png", "jpg"])
            .shape_policy(ShapePolicy::Skip)
            .build();

        assert_eq!(config.output_paths().test.labels, PathBuf::from("out/t10k-labels-idx1-ubyte"));
        assert_eq!(config.per_label, Some(10));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.extensions, vec!["png", "jpg"]);
        assert_eq!(config.shape_policy, ShapePolicy::Skip);
    }
}

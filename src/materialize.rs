//! Image decoding into fixed-shape pixel arrays.
//!
//! The materializer decodes every sampled file through an [`ImageDecoder`],
//! fixes the [`ImageShape`] from the first image that decodes, and packs the
//! pixels of all images into one contiguous row-major buffer. Files that
//! fail to decode are logged and dropped; the run goes on with fewer
//! samples.
//!
//! # Example
//!
//! ```ignore
//! use idx_convert::materialize::{materialize, ImageCrateDecoder, ShapePolicy};
//!
//! let materialized = materialize(samples, &ImageCrateDecoder, ShapePolicy::Fail)?;
//! let split = materialized.split(SplitMode::Percent(10.0));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::dataset::Sample;
use crate::error::{Error, Result};
use crate::idx::IdxDataset;
use crate::split::SplitMode;

/// Geometry shared by every image of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    /// Rows per image.
    pub height: usize,
    /// Columns per image.
    pub width: usize,
    /// Interleaved channels per pixel (1 for grayscale).
    pub channels: usize,
}

impl ImageShape {
    /// Create a shape.
    #[must_use]
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    /// Bytes occupied by one image.
    #[must_use]
    pub fn image_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// A decoded image in row-major, channel-interleaved order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image geometry.
    pub shape: ImageShape,
    /// `shape.image_len()` pixel bytes.
    pub pixels: Vec<u8>,
}

/// Decodes an image file into 8-bit pixels.
///
/// Closures of the form `Fn(&Path) -> Result<DecodedImage>` implement this
/// trait, which keeps tests free of real image files.
pub trait ImageDecoder {
    /// Decode the file at `path`.
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

impl<F> ImageDecoder for F
where
    F: Fn(&Path) -> Result<DecodedImage>,
{
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        self(path)
    }
}

/// Decoder backed by the `image` crate.
///
/// Grayscale sources produce one channel, grayscale with alpha two, RGB
/// three and RGBA four. Deeper sample types are reduced to 8 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let load_error = |reason: String| Error::ImageLoad {
            path: path.to_path_buf(),
            reason,
        };

        let img = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| load_error(e.to_string()))?
            .decode()
            .map_err(|e| load_error(e.to_string()))?;

        let height = img.height() as usize;
        let width = img.width() as usize;
        let color = img.color();

        let (channels, pixels) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (1, img.into_luma8().into_raw()),
            (false, true) => (2, img.into_luma_alpha8().into_raw()),
            (true, false) => (3, img.into_rgb8().into_raw()),
            (true, true) => (4, img.into_rgba8().into_raw()),
        };

        Ok(DecodedImage {
            shape: ImageShape::new(height, width, channels),
            pixels,
        })
    }
}

/// What to do with an image whose shape differs from the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Abort the run with [`Error::ShapeMismatch`].
    #[default]
    Fail,
    /// Drop the image like a decode failure and continue.
    Skip,
}

impl FromStr for ShapePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(format!("Unknown shape policy: {other} (expected fail or skip)")),
        }
    }
}

impl fmt::Display for ShapePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// A sample that was dropped during materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// File that was dropped.
    pub path: PathBuf,
    /// Why it was dropped.
    pub reason: String,
}

/// Decoded images and their labels, in sample order.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    /// Shape fixed by the first decoded image, `None` if nothing decoded.
    pub shape: Option<ImageShape>,
    /// One label per decoded image.
    pub labels: Vec<u8>,
    /// Pixels of all decoded images, back to back.
    pub pixels: Vec<u8>,
    /// Samples that could not be used.
    pub skipped: Vec<SkippedFile>,
}

/// Train and test partitions of a materialized sample set.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    /// Items before the split index.
    pub train: IdxDataset,
    /// Items from the split index on.
    pub test: IdxDataset,
}

impl Materialized {
    /// Number of decoded images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Split into train and test partitions at `mode.split_index(len)`.
    ///
    /// Both partitions keep sample order; train is the prefix.
    #[must_use]
    pub fn split(self, mode: SplitMode) -> DatasetSplit {
        let shape = self.shape.unwrap_or_default();
        let index = mode.split_index(self.len());

        let mut train_labels = self.labels;
        let mut train_pixels = self.pixels;
        let test_labels = train_labels.split_off(index);
        let test_pixels = train_pixels.split_off(index * shape.image_len());

        DatasetSplit {
            train: IdxDataset {
                shape,
                labels: train_labels,
                pixels: train_pixels,
            },
            test: IdxDataset {
                shape,
                labels: test_labels,
                pixels: test_pixels,
            },
        }
    }
}

/// Decode every sample, dropping the ones that fail.
///
/// The first image that decodes fixes the shape for the run. Later images
/// with another shape are handled according to `policy`.
pub fn materialize<D: ImageDecoder + ?Sized>(
    samples: Vec<Sample>,
    decoder: &D,
    policy: ShapePolicy,
) -> Result<Materialized> {
    let total = samples.len();
    let mut out = Materialized::default();

    for (i, sample) in samples.into_iter().enumerate() {
        if i % 100 == 0 {
            log::debug!("{}% complete ({i}/{total})", i * 100 / total);
        }

        let image = match decoder.decode(&sample.path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Can't read image file {}: {e}", sample.path.display());
                out.skipped.push(SkippedFile {
                    path: sample.path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let shape = match out.shape {
            Some(shape) => shape,
            None => {
                out.pixels.reserve_exact(total.saturating_sub(i) * image.shape.image_len());
                *out.shape.insert(image.shape)
            }
        };

        if image.shape != shape || image.pixels.len() != shape.image_len() {
            match policy {
                ShapePolicy::Fail => {
                    return Err(Error::ShapeMismatch {
                        path: sample.path,
                        expected: shape,
                        actual: image.shape,
                    });
                }
                ShapePolicy::Skip => {
                    log::warn!(
                        "Skipping {}: shape {} differs from {shape}",
                        sample.path.display(),
                        image.shape
                    );
                    out.skipped.push(SkippedFile {
                        reason: format!("shape {} differs from {shape}", image.shape),
                        path: sample.path,
                    });
                    continue;
                }
            }
        }

        out.pixels.extend_from_slice(&image.pixels);
        out.labels.push(sample.label);
    }

    log::info!(
        "Materialized {} of {total} images ({} skipped)",
        out.len(),
        out.skipped.len()
    );

    Ok(out)
}

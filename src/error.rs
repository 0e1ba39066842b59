//! Error types for idx-convert operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::materialize::ImageShape;

/// Result type alias for idx-convert operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a label tree to IDX files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The dataset root is missing or unusable.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The dataset root has no label subdirectories.
    #[error("No label subdirectories found under {}", .0.display())]
    NoLabels(PathBuf),

    /// More labels than fit in a single label byte.
    #[error("Too many labels: {0} (the label file stores one byte per label, at most 256)")]
    TooManyLabels(usize),

    /// Split specifier is not `train`, `test` or a percentage.
    #[error("Invalid split mode: {0:?} (expected \"train\", \"test\" or a percentage 0-100)")]
    InvalidSplit(String),

    /// More files were requested for a label than it holds.
    #[error("Label {label:?} has {available} usable files, {requested} requested")]
    InsufficientFiles {
        /// Label directory name.
        label: String,
        /// Requested sample count.
        requested: usize,
        /// Non-empty files available.
        available: usize,
    },

    /// Failed to decode an image file.
    #[error("Image load failed: {}: {reason}", .path.display())]
    ImageLoad {
        /// Path to the image that failed to load.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// An image does not match the shape fixed by the first decoded image.
    #[error("Shape mismatch in {}: expected {expected}, got {actual}", .path.display())]
    ShapeMismatch {
        /// Offending image.
        path: PathBuf,
        /// Shape fixed by the first decoded image.
        expected: ImageShape,
        /// Shape of this image.
        actual: ImageShape,
    },

    /// A header field does not fit in a signed 32-bit integer.
    #[error("IDX header field {field} out of range: {value}")]
    HeaderOverflow {
        /// Header field name.
        field: &'static str,
        /// Value that did not fit.
        value: usize,
    },

    /// Unexpected magic number when reading an IDX file.
    #[error("Bad IDX magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// Magic number for the expected file kind.
        expected: i32,
        /// Magic number found in the header.
        found: i32,
    },

    /// IDX payload shorter than its header announces.
    #[error("Truncated IDX payload: expected {expected} bytes, found {found}")]
    Truncated {
        /// Bytes announced by the header.
        expected: usize,
        /// Bytes actually present.
        found: usize,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

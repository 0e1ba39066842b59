//! # idx-convert
//!
//! Convert a folder of labeled images into the IDX file pairs used by MNIST.
//!
//! The dataset root holds one subdirectory per class. Labels are numbered by
//! the sorted order of those directory names. A bounded random sample is
//! drawn from every label, the pool is shuffled, decoded into fixed-shape
//! `u8` arrays, split into train and test partitions and written as
//! big-endian IDX files.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use idx_convert::{ConvertConfig, Converter, SplitMode};
//!
//! let config = ConvertConfig::builder("notMNIST_small")
//!     .mode(SplitMode::Test)
//!     .per_label(Some(1000))
//!     .seed(Some(42))
//!     .build();
//!
//! let report = Converter::new(config).run()?;
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`dataset`]: Label discovery and per-label file sampling
//! - [`split`]: Train/test split modes and shuffling
//! - [`materialize`]: Image decoding into pixel arrays
//! - [`idx`]: IDX encoding and decoding
//! - [`convert`]: The end-to-end pipeline
//! - [`report`]: Run reports and manifests
//! - [`checksum`]: Checksums of written files

pub mod checksum;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod idx;
pub mod materialize;
pub mod report;
pub mod split;

// Re-export commonly used types
pub use convert::{ConvertConfig, Converter, verify};
pub use dataset::{LabelStats, Sample, SampleSet};
pub use error::{Error, Result};
pub use idx::{IdxDataset, IdxPair, OutputPaths};
pub use materialize::{
    DatasetSplit, DecodedImage, ImageCrateDecoder, ImageDecoder, ImageShape, Materialized,
    ShapePolicy,
};
pub use report::{ConversionReport, PartitionReport, WrittenFile};
pub use split::SplitMode;

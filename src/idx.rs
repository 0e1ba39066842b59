//! IDX binary encoding.
//!
//! Label files hold a big-endian `i32` magic `0x00000801`, an `i32` count
//! and one byte per label. Image files hold the magic `0x00000803`, `i32`
//! count, height and width, then the raw pixel bytes of every image in
//! row-major order. Multi-channel images are written interleaved with no
//! channel field; readers infer it from the payload length.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::materialize::ImageShape;

/// Magic number of an IDX label file (unsigned byte, one dimension).
pub const LABEL_MAGIC: i32 = 0x0000_0801;

/// Magic number of an IDX image file (unsigned byte, three dimensions).
pub const IMAGE_MAGIC: i32 = 0x0000_0803;

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "convert_MNIST";

/// File name of the training images.
pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
/// File name of the training labels.
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
/// File name of the test images.
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
/// File name of the test labels.
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Images and labels of one partition, ready to encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdxDataset {
    /// Shape of every image.
    pub shape: ImageShape,
    /// One label per image.
    pub labels: Vec<u8>,
    /// `labels.len() * shape.image_len()` pixel bytes.
    pub pixels: Vec<u8>,
}

impl IdxDataset {
    /// Number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the partition holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pixels of the image at `index`.
    #[must_use]
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        let len = self.shape.image_len();
        self.pixels.get(index * len..(index + 1) * len)
    }
}

/// The pair of files written for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxPair {
    /// Image file path.
    pub images: PathBuf,
    /// Label file path.
    pub labels: PathBuf,
}

/// Fixed output locations below an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Training pair.
    pub train: IdxPair,
    /// Test pair.
    pub test: IdxPair,
}

impl OutputPaths {
    /// Output paths under `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            train: IdxPair {
                images: dir.join(TRAIN_IMAGES),
                labels: dir.join(TRAIN_LABELS),
            },
            test: IdxPair {
                images: dir.join(TEST_IMAGES),
                labels: dir.join(TEST_LABELS),
            },
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

fn header_field(field: &'static str, value: usize) -> Result<[u8; 4]> {
    i32::try_from(value)
        .map(i32::to_be_bytes)
        .map_err(|_| Error::HeaderOverflow { field, value })
}

fn label_header(labels: &[u8]) -> Result<[u8; 8]> {
    let mut header = [0u8; 8];
    header[..4].copy_from_slice(&LABEL_MAGIC.to_be_bytes());
    header[4..].copy_from_slice(&header_field("count", labels.len())?);
    Ok(header)
}

fn image_header(dataset: &IdxDataset) -> Result<[u8; 16]> {
    let mut header = [0u8; 16];
    header[..4].copy_from_slice(&IMAGE_MAGIC.to_be_bytes());
    header[4..8].copy_from_slice(&header_field("count", dataset.len())?);
    header[8..12].copy_from_slice(&header_field("height", dataset.shape.height)?);
    header[12..].copy_from_slice(&header_field("width", dataset.shape.width)?);
    Ok(header)
}

/// Write a label file body to `w`.
pub fn write_labels<W: Write>(w: &mut W, labels: &[u8]) -> Result<()> {
    w.write_all(&label_header(labels)?)?;
    w.write_all(labels)?;
    Ok(())
}

/// Write an image file body to `w`.
pub fn write_images<W: Write>(w: &mut W, dataset: &IdxDataset) -> Result<()> {
    w.write_all(&image_header(dataset)?)?;
    w.write_all(&dataset.pixels)?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a label file, replacing any existing file at `path`.
///
/// Header fields are checked before the file is touched.
pub fn write_label_file(path: &Path, labels: &[u8]) -> Result<()> {
    let header = label_header(labels)?;
    let mut w = create(path)?;
    w.write_all(&header)?;
    w.write_all(labels)?;
    w.flush()?;
    Ok(())
}

/// Write an image file, replacing any existing file at `path`.
///
/// Header fields are checked before the file is touched.
pub fn write_image_file(path: &Path, dataset: &IdxDataset) -> Result<()> {
    let header = image_header(dataset)?;
    let mut w = create(path)?;
    w.write_all(&header)?;
    w.write_all(&dataset.pixels)?;
    w.flush()?;
    Ok(())
}

/// Write both files of a partition.
///
/// Neither file is written when either header is out of range.
pub fn write_pair(pair: &IdxPair, dataset: &IdxDataset) -> Result<()> {
    label_header(&dataset.labels)?;
    image_header(dataset)?;
    write_label_file(&pair.labels, &dataset.labels)?;
    write_image_file(&pair.images, dataset)?;
    log::info!(
        "Wrote {} samples to {} and {}",
        dataset.len(),
        pair.labels.display(),
        pair.images.display()
    );
    Ok(())
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_magic<R: Read>(r: &mut R, expected: i32) -> Result<()> {
    let found = read_i32(r)?;
    if found != expected {
        return Err(Error::BadMagic { expected, found });
    }
    Ok(())
}

fn read_dim<R: Read>(r: &mut R) -> Result<usize> {
    let value = read_i32(r)?;
    usize::try_from(value).map_err(|_| Error::Dataset(format!("Negative IDX dimension: {value}")))
}

/// Read a label file body from `r`.
pub fn read_labels<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    read_magic(r, LABEL_MAGIC)?;
    let count = read_dim(r)?;

    let mut labels = Vec::new();
    r.read_to_end(&mut labels)?;
    if labels.len() != count {
        return Err(Error::Truncated {
            expected: count,
            found: labels.len(),
        });
    }
    Ok(labels)
}

/// Read an image file body from `r`.
///
/// The channel count is inferred from the payload length; an empty file
/// reports one channel.
pub fn read_images<R: Read>(r: &mut R) -> Result<IdxDataset> {
    read_magic(r, IMAGE_MAGIC)?;
    let count = read_dim(r)?;
    let height = read_dim(r)?;
    let width = read_dim(r)?;

    let mut pixels = Vec::new();
    r.read_to_end(&mut pixels)?;

    let plane = count
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| Error::Dataset(format!("IDX dimensions too large: {count}x{height}x{width}")))?;
    let channels = if plane == 0 { 1 } else { pixels.len() / plane };
    if channels == 0 || pixels.len() != plane * channels {
        return Err(Error::Truncated {
            expected: plane * channels.max(1),
            found: pixels.len(),
        });
    }

    Ok(IdxDataset {
        shape: ImageShape::new(height, width, channels),
        labels: vec![0; count],
        pixels,
    })
}

/// Read a label file.
pub fn read_label_file(path: &Path) -> Result<Vec<u8>> {
    read_labels(&mut BufReader::new(File::open(path)?))
}

/// Read an image file. Labels of the returned dataset are zeroed.
pub fn read_image_file(path: &Path) -> Result<IdxDataset> {
    read_images(&mut BufReader::new(File::open(path)?))
}

/// Read a label/image pair back into one dataset.
pub fn read_pair(pair: &IdxPair) -> Result<IdxDataset> {
    let labels = read_label_file(&pair.labels)?;
    let mut dataset = read_image_file(&pair.images)?;
    if labels.len() != dataset.len() {
        return Err(Error::Dataset(format!(
            "{} holds {} labels but {} holds {} images",
            pair.labels.display(),
            labels.len(),
            pair.images.display(),
            dataset.len()
        )));
    }
    dataset.labels = labels;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn dataset(count: usize, shape: ImageShape) -> IdxDataset {
        IdxDataset {
            shape,
            labels: (0..count).map(|i| (i % 10) as u8).collect(),
            pixels: (0..count * shape.image_len()).map(|i| (i % 251) as u8).collect(),
        }
    }

    #[test]
    fn test_label_header_layout() {
        let mut buf = Vec::new();
        write_labels(&mut buf, &[3, 1, 4]).unwrap();
        assert_eq!(buf, vec![0u8, 0, 8, 1, 0, 0, 0, 3, 3, 1, 4]);
    }

    #[test]
    fn test_image_header_layout() {
        let ds = dataset(2, ImageShape::new(2, 3, 1));
        let mut buf = Vec::new();
        write_images(&mut buf, &ds).unwrap();

        assert_eq!(&buf[..16], &[0u8, 0, 8, 3, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 3]);
        assert_eq!(&buf[16..], ds.pixels.as_slice());
    }

    #[test]
    fn test_empty_partition_header() {
        let ds = IdxDataset {
            shape: ImageShape::new(28, 28, 1),
            ..IdxDataset::default()
        };
        let mut buf = Vec::new();
        write_images(&mut buf, &ds).unwrap();
        assert_eq!(buf.len(), 16);

        let back = read_images(&mut Cursor::new(buf)).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.shape, ImageShape::new(28, 28, 1));
    }

    #[test]
    fn test_labels_read_back() {
        let mut buf = Vec::new();
        write_labels(&mut buf, &[0, 1, 1, 0, 9]).unwrap();
        assert_eq!(read_labels(&mut Cursor::new(buf)).unwrap(), vec![0, 1, 1, 0, 9]);
    }

    #[test]
    fn test_rgb_channels_inferred() {
        let ds = dataset(4, ImageShape::new(5, 6, 3));
        let mut buf = Vec::new();
        write_images(&mut buf, &ds).unwrap();

        let back = read_images(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back.shape, ImageShape::new(5, 6, 3));
        assert_eq!(back.pixels, ds.pixels);
        assert_eq!(back.image(1), ds.image(1));
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = Vec::new();
        write_labels(&mut buf, &[1]).unwrap();
        let err = read_images(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            Error::BadMagic { expected: IMAGE_MAGIC, found: LABEL_MAGIC }
        ));
    }

    #[test]
    fn test_truncated_labels() {
        let mut buf = Vec::new();
        write_labels(&mut buf, &[1, 2, 3]).unwrap();
        buf.pop();
        let err = read_labels(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::Truncated { expected: 3, found: 2 }));
    }

    #[test]
    fn test_pair_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path().join("out"));
        let ds = dataset(3, ImageShape::new(2, 2, 1));

        write_pair(&paths.train, &ds).unwrap();
        assert_eq!(read_pair(&paths.train).unwrap(), ds);
        assert!(!paths.test.labels.exists());
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRAIN_LABELS);
        fs::write(&path, vec![0xAA; 64]).unwrap();

        write_label_file(&path, &[7]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0u8, 0, 8, 1, 0, 0, 0, 1, 7]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_header_overflow_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRAIN_IMAGES);
        fs::write(&path, b"previous").unwrap();

        let ds = IdxDataset {
            shape: ImageShape::new(1 << 31, 1, 1),
            ..IdxDataset::default()
        };
        let err = write_image_file(&path, &ds).unwrap_err();
        assert!(matches!(
            err,
            Error::HeaderOverflow { field: "height", value } if value == 1 << 31
        ));
        assert_eq!(fs::read(&path).unwrap(), b"previous");

        let missing = dir.path().join("out").join(TEST_IMAGES);
        assert!(write_image_file(&missing, &ds).is_err());
        assert!(!missing.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_pair_header_overflow_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path());
        let ds = IdxDataset {
            shape: ImageShape::new(1, 1 << 31, 1),
            ..IdxDataset::default()
        };

        let err = write_pair(&paths.train, &ds).unwrap_err();
        assert!(matches!(err, Error::HeaderOverflow { field: "width", .. }));
        assert!(!paths.train.labels.exists());
        assert!(!paths.train.images.exists());
    }

    #[test]
    fn test_output_paths() {
        let paths = OutputPaths::default();
        assert_eq!(paths.train.images, Path::new("convert_MNIST/train-images-idx3-ubyte"));
        assert_eq!(paths.train.labels, Path::new("convert_MNIST/train-labels-idx1-ubyte"));
        assert_eq!(paths.test.images, Path::new("convert_MNIST/t10k-images-idx3-ubyte"));
        assert_eq!(paths.test.labels, Path::new("convert_MNIST/t10k-labels-idx1-ubyte"));
    }
}

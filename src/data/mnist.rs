//! MNIST dataset in IDX format
//!
//! Reads the uncompressed training files distributed at
//! <http://yann.lecun.com/exdb/mnist/>:
//! - `train-images-idx3-ubyte`: magic 2051, count, rows, cols, then pixels
//! - `train-labels-idx1-ubyte`: magic 2049, count, then labels
//!
//! All header integers are big-endian u32.

use ndarray::{Array1, Array3, Axis};
use std::path::Path;

use crate::error::{Error, Result};

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// Default file name of the training images
pub const TRAIN_IMAGES_FILE: &str = "train-images-idx3-ubyte";
/// Default file name of the training labels
pub const TRAIN_LABELS_FILE: &str = "train-labels-idx1-ubyte";

/// Raw grayscale images with their class labels
#[derive(Debug, Clone)]
pub struct MnistDataset {
    /// Pixels of shape (num_images, height, width), values in [0, 255]
    pub images: Array3<u8>,
    /// One label per image
    pub labels: Array1<u8>,
}

impl MnistDataset {
    /// Pair images with labels, checking that the counts agree
    pub fn new(images: Array3<u8>, labels: Array1<u8>) -> Result<Self> {
        if images.len_of(Axis(0)) != labels.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels",
                images.len_of(Axis(0)),
                labels.len()
            )));
        }
        Ok(Self { images, labels })
    }

    /// Load the training split from a directory of IDX files
    pub fn load_train<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let images = read_idx_images(dir.join(TRAIN_IMAGES_FILE))?;
        let labels = read_idx_labels(dir.join(TRAIN_LABELS_FILE))?;
        Self::new(images, labels)
    }

    /// Keep only the first `n` samples
    pub fn truncate(mut self, n: usize) -> Self {
        let n = n.min(self.len());
        self.images = self.images.slice_axis(Axis(0), (0..n).into()).to_owned();
        self.labels = self.labels.slice_axis(Axis(0), (0..n).into()).to_owned();
        self
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.images.shape()[1]
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.images.shape()[2]
    }
}

fn read_be_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    let bytes = data
        .get(*offset..*offset + 4)
        .ok_or_else(|| Error::Dataset("truncated IDX header".to_string()))?;
    *offset += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Parse an IDX3 image file held in memory
pub fn parse_idx_images(data: &[u8]) -> Result<Array3<u8>> {
    let mut offset = 0;
    let magic = read_be_u32(data, &mut offset)?;
    if magic != IMAGES_MAGIC {
        return Err(Error::Dataset(format!(
            "bad image file magic {magic}, expected {IMAGES_MAGIC}"
        )));
    }

    let count = read_be_u32(data, &mut offset)? as usize;
    let rows = read_be_u32(data, &mut offset)? as usize;
    let cols = read_be_u32(data, &mut offset)? as usize;

    let end = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .and_then(|total| offset.checked_add(total))
        .ok_or_else(|| Error::Dataset(format!("IDX header sizes {count}x{rows}x{cols} overflow")))?;
    let pixels = data
        .get(offset..end)
        .ok_or_else(|| Error::Dataset("image file is truncated".to_string()))?;

    Array3::from_shape_vec((count, rows, cols), pixels.to_vec())
        .map_err(|e| Error::Dataset(e.to_string()))
}

/// Parse an IDX1 label file held in memory
pub fn parse_idx_labels(data: &[u8]) -> Result<Array1<u8>> {
    let mut offset = 0;
    let magic = read_be_u32(data, &mut offset)?;
    if magic != LABELS_MAGIC {
        return Err(Error::Dataset(format!(
            "bad label file magic {magic}, expected {LABELS_MAGIC}"
        )));
    }

    let count = read_be_u32(data, &mut offset)? as usize;
    let end = offset
        .checked_add(count)
        .ok_or_else(|| Error::Dataset(format!("IDX label count {count} overflows")))?;
    let labels = data
        .get(offset..end)
        .ok_or_else(|| Error::Dataset("label file is truncated".to_string()))?;

    Ok(Array1::from(labels.to_vec()))
}

/// Read an IDX3 image file
pub fn read_idx_images<P: AsRef<Path>>(path: P) -> Result<Array3<u8>> {
    let data = std::fs::read(path.as_ref())?;
    parse_idx_images(&data)
}

/// Read an IDX1 label file
pub fn read_idx_labels<P: AsRef<Path>>(path: P) -> Result<Array1<u8>> {
    let data = std::fs::read(path.as_ref())?;
    parse_idx_labels(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx_images(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        for v in [IMAGES_MAGIC, count, rows, cols] {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        buf.extend_from_slice(pixels);
        buf
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        buf.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        buf.extend_from_slice(labels);
        buf
    }

    #[test]
    fn test_parse_images() {
        let pixels: Vec<u8> = (0..8).collect();
        let images = parse_idx_images(&idx_images(2, 2, 2, &pixels)).unwrap();

        assert_eq!(images.shape(), &[2, 2, 2]);
        assert_eq!(images[[1, 0, 1]], 5);
    }

    #[test]
    fn test_parse_rejects_bad_magic_and_truncation() {
        let mut data = idx_images(1, 2, 2, &[0, 0, 0, 0]);
        data[3] = 0;
        assert!(parse_idx_images(&data).is_err());

        let data = idx_images(2, 2, 2, &[0; 5]);
        assert!(parse_idx_images(&data).is_err());

        assert!(parse_idx_labels(&[0, 0]).is_err());
    }

    #[test]
    fn test_parse_rejects_huge_header_sizes() {
        let data = idx_images(u32::MAX, u32::MAX, u32::MAX, &[0; 16]);
        assert!(matches!(parse_idx_images(&data), Err(Error::Dataset(_))));

        let data = idx_images(u32::MAX, 1, 1, &[0; 16]);
        assert!(matches!(parse_idx_images(&data), Err(Error::Dataset(_))));

        let mut data = LABELS_MAGIC.to_be_bytes().to_vec();
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(parse_idx_labels(&data), Err(Error::Dataset(_))));
    }

    #[test]
    fn test_load_train_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(TRAIN_IMAGES_FILE),
            idx_images(3, 2, 2, &[7; 12]),
        )
        .unwrap();
        std::fs::write(dir.path().join(TRAIN_LABELS_FILE), idx_labels(&[4, 1, 9])).unwrap();

        let dataset = MnistDataset::load_train(dir.path()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.height(), 2);
        assert_eq!(dataset.labels.to_vec(), vec![4, 1, 9]);

        let dataset = dataset.truncate(2);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.images.shape(), &[2, 2, 2]);
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let images = Array3::<u8>::zeros((3, 2, 2));
        let labels = Array1::<u8>::zeros(2);
        assert!(MnistDataset::new(images, labels).is_err());
    }
}

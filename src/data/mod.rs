//! Data module for loading and batching handwritten digits
//!
//! This module provides:
//! - MNIST IDX file reader
//! - Pixel normalization to [-1, 1] and back
//! - DataLoader for batching labeled images

mod loader;
mod mnist;
mod preprocessing;

pub use loader::{Batch, DataLoader};
pub use mnist::{
    parse_idx_images, parse_idx_labels, read_idx_images, read_idx_labels, MnistDataset,
    TRAIN_IMAGES_FILE, TRAIN_LABELS_FILE,
};
pub use preprocessing::{denormalize_images, normalize_images, to_pixel, PIXEL_SCALE};

//! DataLoader for batching labeled images
//!
//! Provides batching for GAN training with support for:
//! - Seeded shuffling, repeated at every reset
//! - Drop last incomplete batch
//! - Iteration over batches

use ndarray::{Array1, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Tensor};

use super::mnist::MnistDataset;
use super::preprocessing::normalize_images;

/// One batch of real samples
#[derive(Debug, Clone)]
pub struct Batch {
    /// Normalized images of shape (batch_size, height, width)
    pub images: Array3<f32>,
    /// Class labels
    pub labels: Vec<i64>,
}

impl Batch {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Images as a channel-first tensor of shape (batch_size, 1, height, width)
    pub fn images_tensor(&self, device: Device) -> Tensor {
        let (n, h, w) = self.images.dim();
        let flat: Vec<f32> = self.images.iter().copied().collect();
        Tensor::from_slice(&flat)
            .view([n as i64, 1, h as i64, w as i64])
            .to_device(device)
    }
}

/// DataLoader for iterating over batched images
pub struct DataLoader {
    /// Normalized images of shape (num_images, height, width)
    images: Array3<f32>,
    /// Labels, one per image
    labels: Array1<i64>,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Whether to drop the last incomplete batch
    drop_last: bool,
    /// Current indices for iteration
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
    rng: StdRng,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `images` - Normalized images of shape (num_images, height, width)
    /// * `labels` - One label per image
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    /// * `seed` - Seed for the shuffling RNG
    pub fn new(
        images: Array3<f32>,
        labels: Array1<i64>,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        seed: u64,
    ) -> Self {
        let num_samples = images.shape()[0];
        let indices: Vec<usize> = (0..num_samples).collect();

        let mut loader = Self {
            images,
            labels,
            batch_size,
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
            rng: StdRng::seed_from_u64(seed),
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Build a shuffling, drop-last loader from a raw dataset
    pub fn from_dataset(dataset: &MnistDataset, batch_size: usize, seed: u64) -> Self {
        let images = normalize_images(&dataset.images);
        let labels = dataset.labels.mapv(i64::from);
        Self::new(images, labels, batch_size, true, true, seed)
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.images.shape()[0]
    }

    /// Batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.images.shape()[1]
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.images.shape()[2]
    }

    fn shuffle_indices(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Batch> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);
        let actual_batch_size = end - start;

        if self.drop_last && actual_batch_size < self.batch_size {
            return None;
        }

        let selected = &self.indices[start..end];
        let images = self.images.select(Axis(0), selected);
        let labels = selected.iter().map(|&i| self.labels[i]).collect();

        self.current_idx = end;
        Some(Batch { images, labels })
    }

    /// Iterate over all batches of one epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

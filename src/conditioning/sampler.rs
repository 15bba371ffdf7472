//! Noise and label sampling for generator inputs

use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use tch::{Device, Tensor};

use super::encoder::LabelEncoder;
use crate::error::Result;

/// Draws latent noise and class labels
#[derive(Debug, Clone)]
pub struct LatentSampler {
    z_dim: usize,
    class_num: usize,
    noise: Uniform<f32>,
}

impl LatentSampler {
    /// Create a sampler for `z_dim`-sized noise and `class_num` classes
    pub fn new(z_dim: usize, class_num: usize) -> Self {
        Self {
            z_dim,
            class_num,
            noise: Uniform::new_inclusive(-1.0, 1.0),
        }
    }

    /// Latent dimension
    pub fn z_dim(&self) -> usize {
        self.z_dim
    }

    /// Noise matrix of shape `(n, z_dim)` drawn uniformly from [-1, 1]
    pub fn sample_noise<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, self.z_dim), |_| self.noise.sample(rng))
    }

    /// `n` labels drawn uniformly from `[0, class_num)`
    pub fn sample_labels<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<i64> {
        (0..n)
            .map(|_| rng.gen_range(0..self.class_num) as i64)
            .collect()
    }

    /// Labels `0, 1, .., class_num - 1, 0, 1, ..` of length `n`
    ///
    /// Used for sample grids so every saved grid has the same label layout.
    pub fn cycling_labels(&self, n: usize) -> Vec<i64> {
        (0..n).map(|i| (i % self.class_num) as i64).collect()
    }
}

/// Generator inputs for one batch: noise, one-hot labels and label images
#[derive(Debug)]
pub struct ConditioningBatch {
    /// Class labels, one per sample
    pub labels: Vec<i64>,
    /// Noise tensor `(batch, z_dim)`
    pub noise: Tensor,
    /// One-hot labels `(batch, class_num)`
    pub onehot: Tensor,
    /// Label channel images `(batch, class_num, height, width)`
    pub label_images: Tensor,
}

impl ConditioningBatch {
    /// Build a batch from a noise matrix and its labels
    pub fn new(
        noise: &Array2<f32>,
        labels: Vec<i64>,
        encoder: &LabelEncoder,
        device: Device,
    ) -> Result<Self> {
        let (rows, cols) = noise.dim();
        let flat: Vec<f32> = noise.iter().copied().collect();
        let noise = Tensor::from_slice(&flat)
            .view([rows as i64, cols as i64])
            .to_device(device);

        let onehot = encoder.onehot_batch(&labels, device)?;
        let label_images = encoder.channel_image_batch(&labels, device)?;

        Ok(Self {
            labels,
            noise,
            onehot,
            label_images,
        })
    }

    /// Sample fresh noise and uniformly random labels
    pub fn random<R: Rng + ?Sized>(
        sampler: &LatentSampler,
        encoder: &LabelEncoder,
        rng: &mut R,
        batch_size: usize,
        device: Device,
    ) -> Result<Self> {
        let noise = sampler.sample_noise(rng, batch_size);
        let labels = sampler.sample_labels(rng, batch_size);
        Self::new(&noise, labels, encoder, device)
    }

    /// Sample fresh noise with cycling labels
    pub fn cycling<R: Rng + ?Sized>(
        sampler: &LatentSampler,
        encoder: &LabelEncoder,
        rng: &mut R,
        batch_size: usize,
        device: Device,
    ) -> Result<Self> {
        let noise = sampler.sample_noise(rng, batch_size);
        let labels = sampler.cycling_labels(batch_size);
        Self::new(&noise, labels, encoder, device)
    }

    /// Number of samples in the batch
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_noise_within_unit_range() {
        let sampler = LatentSampler::new(30, 10);
        let mut rng = StdRng::seed_from_u64(7);

        let noise = sampler.sample_noise(&mut rng, 64);
        assert_eq!(noise.dim(), (64, 30));
        assert!(noise.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_random_labels_in_range() {
        let sampler = LatentSampler::new(30, 10);
        let mut rng = StdRng::seed_from_u64(7);

        let labels = sampler.sample_labels(&mut rng, 500);
        assert!(labels.iter().all(|&l| (0..10).contains(&l)));
    }

    #[test]
    fn test_cycling_labels() {
        let sampler = LatentSampler::new(30, 10);
        let labels = sampler.cycling_labels(32);

        assert_eq!(labels.len(), 32);
        assert_eq!(&labels[..12], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1]);
        assert_eq!(labels[31], 1);
    }

    #[test]
    fn test_conditioning_batch_shapes() {
        let sampler = LatentSampler::new(30, 10);
        let encoder = LabelEncoder::new(10, 28, 28);
        let mut rng = StdRng::seed_from_u64(3);

        let batch = ConditioningBatch::random(&sampler, &encoder, &mut rng, 4, Device::Cpu).unwrap();

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.noise.size(), vec![4, 30]);
        assert_eq!(batch.onehot.size(), vec![4, 10]);
        assert_eq!(batch.label_images.size(), vec![4, 10, 28, 28]);
    }
}

//! Label encoding for generator and discriminator conditioning
//!
//! A class label reaches the two networks in different shapes:
//! - the generator sees a one-hot vector appended to the noise vector
//! - the discriminator sees a stack of constant image channels appended to the
//!   image, one channel per class, with only the label's channel set to 1

use ndarray::{s, Array1, Array3};
use tch::{Device, Tensor};

use crate::error::{Error, Result};

/// Encodes integer class labels into one-hot vectors and label channel images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEncoder {
    class_num: usize,
    height: usize,
    width: usize,
}

impl LabelEncoder {
    /// Create an encoder for `class_num` classes and `height` x `width` images
    pub fn new(class_num: usize, height: usize, width: usize) -> Self {
        Self {
            class_num,
            height,
            width,
        }
    }

    /// Number of classes
    pub fn class_num(&self) -> usize {
        self.class_num
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.width
    }

    fn check(&self, label: i64) -> Result<usize> {
        if label < 0 || label as usize >= self.class_num {
            return Err(Error::InvalidLabel {
                label,
                class_num: self.class_num,
            });
        }
        Ok(label as usize)
    }

    /// One-hot vector of length `class_num` with a single 1 at `label`
    pub fn label_to_onehot(&self, label: i64) -> Result<Array1<f32>> {
        let index = self.check(label)?;
        let mut onehot = Array1::<f32>::zeros(self.class_num);
        onehot[index] = 1.0;
        Ok(onehot)
    }

    /// Label channel image of shape `(height, width, class_num)`
    ///
    /// Every spatial position of channel `label` is 1, everything else is 0.
    pub fn label_to_channel_image(&self, label: i64) -> Result<Array3<f32>> {
        let index = self.check(label)?;
        let mut image = Array3::<f32>::zeros((self.height, self.width, self.class_num));
        image.slice_mut(s![.., .., index]).fill(1.0);
        Ok(image)
    }

    /// Batched one-hot tensor of shape `(batch, class_num)`
    pub fn onehot_batch(&self, labels: &[i64], device: Device) -> Result<Tensor> {
        let mut flat = Vec::with_capacity(labels.len() * self.class_num);
        for &label in labels {
            flat.extend(self.label_to_onehot(label)?.iter().copied());
        }

        Ok(Tensor::from_slice(&flat)
            .view([labels.len() as i64, self.class_num as i64])
            .to_device(device))
    }

    /// Batched label images in channel-first layout `(batch, class_num, height, width)`
    pub fn channel_image_batch(&self, labels: &[i64], device: Device) -> Result<Tensor> {
        let per_label = self.class_num * self.height * self.width;
        let mut flat = Vec::with_capacity(labels.len() * per_label);
        for &label in labels {
            let image = self.label_to_channel_image(label)?;
            // (H, W, C) -> (C, H, W); iter() walks the permuted logical order
            flat.extend(image.permuted_axes([2, 0, 1]).iter().copied());
        }

        Ok(Tensor::from_slice(&flat)
            .view([
                labels.len() as i64,
                self.class_num as i64,
                self.height as i64,
                self.width as i64,
            ])
            .to_device(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnist_encoder() -> LabelEncoder {
        LabelEncoder::new(10, 28, 28)
    }

    #[test]
    fn test_onehot_has_single_one_at_label() {
        let encoder = mnist_encoder();

        for label in 0..10 {
            let onehot = encoder.label_to_onehot(label).unwrap();
            assert_eq!(onehot.len(), 10);
            assert_eq!(onehot.sum(), 1.0);
            assert_eq!(onehot[label as usize], 1.0);
            assert_eq!(onehot.iter().filter(|&&v| v == 1.0).count(), 1);
        }
    }

    #[test]
    fn test_channel_image_sets_only_label_channel() {
        let encoder = mnist_encoder();

        for label in 0..10usize {
            let image = encoder.label_to_channel_image(label as i64).unwrap();
            assert_eq!(image.shape(), &[28, 28, 10]);

            for ((_, _, c), &value) in image.indexed_iter() {
                let expected = if c == label { 1.0 } else { 0.0 };
                assert_eq!(value, expected);
            }
        }
    }

    #[test]
    fn test_invalid_labels_rejected() {
        let encoder = mnist_encoder();

        for label in [-1, 10, 11, 255, i64::MIN] {
            let err = encoder.label_to_onehot(label).unwrap_err();
            assert!(err.is_invalid_label());

            let err = encoder.label_to_channel_image(label).unwrap_err();
            assert!(matches!(err, Error::InvalidLabel { class_num: 10, .. }));
        }
    }

    #[test]
    fn test_channel_image_batch_layout() {
        let encoder = LabelEncoder::new(3, 2, 2);
        let batch = encoder.channel_image_batch(&[2, 0], Device::Cpu).unwrap();

        assert_eq!(batch.size(), vec![2, 3, 2, 2]);
        assert_eq!(batch.double_value(&[0, 2, 1, 1]), 1.0);
        assert_eq!(batch.double_value(&[0, 0, 0, 0]), 0.0);
        assert_eq!(batch.double_value(&[1, 0, 1, 0]), 1.0);
        assert_eq!(batch.double_value(&[1, 1, 0, 1]), 0.0);
    }

    #[test]
    fn test_batch_helpers_reject_invalid_label() {
        let encoder = mnist_encoder();

        assert!(encoder.onehot_batch(&[1, 2, 10], Device::Cpu).is_err());
        assert!(encoder.channel_image_batch(&[-3], Device::Cpu).is_err());
    }
}

//! Loss functions for GAN training
//!
//! Both networks are trained with binary cross-entropy. The discriminator
//! emits logits, so the sigmoid is folded into the loss, which keeps the loss
//! finite when the discriminator saturates.

use tch::Tensor;

/// Binary cross-entropy between discriminator logits and 0/1 targets
///
/// # Arguments
///
/// * `logits` - Discriminator output (before sigmoid), shape (batch, 1)
/// * `targets` - 1 for real, 0 for fake, same shape as `logits`
///
/// # Returns
///
/// Scalar loss tensor (mean over the batch)
pub fn binary_cross_entropy(logits: &Tensor, targets: &Tensor) -> Tensor {
    logits.binary_cross_entropy_with_logits::<Tensor>(targets, None, None, tch::Reduction::Mean)
}

/// Generator loss: -log(D(G(z, y), y))
///
/// The generator wants the discriminator to output 1 (real) for its images.
pub fn generator_loss(fake_logits: &Tensor) -> Tensor {
    binary_cross_entropy(fake_logits, &Tensor::ones_like(fake_logits))
}

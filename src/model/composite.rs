//! Generator-through-discriminator composite
//!
//! The generator has no loss of its own. It is trained by chaining its output
//! into the discriminator and pushing the discriminator's verdict towards
//! "real". Only the generator's optimizer lives here; the discriminator is
//! borrowed for each update.

use tch::{nn, Tensor};

use super::discriminator::Discriminator;
use super::generator::Generator;
use super::optimizer::OptimizerSettings;
use crate::conditioning::ConditioningBatch;
use crate::error::Result;
use crate::training::losses::generator_loss;

/// How the discriminator takes part in a composite update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorMode {
    /// Parameters are left untouched; gradients flow through to the generator only
    #[default]
    Frozen,
    /// Parameters are stepped on the same "real" target as the generator
    Trainable,
}

/// Trains the generator through the discriminator
pub struct CompositeTrainer {
    optimizer: nn::Optimizer,
}

impl CompositeTrainer {
    /// Build the composite once per run for `generator`
    pub fn new(generator: &Generator, settings: &OptimizerSettings) -> Result<Self> {
        let optimizer = settings.build(generator.var_store())?;
        Ok(Self { optimizer })
    }

    /// Generator output stacked with label images, shape (batch, 1 + class_num, H, W)
    pub fn conditioned_fakes(generator: &Generator, batch: &ConditioningBatch, train: bool) -> Tensor {
        let fake = generator.forward_t(&batch.noise, &batch.onehot, train);
        Tensor::cat(&[&fake, &batch.label_images], 1)
    }

    /// One gradient step on generator parameters, returns the loss
    ///
    /// The loss is binary cross-entropy of the discriminator's verdict on
    /// freshly generated images against the constant target 1 ("real").
    /// With [`DiscriminatorMode::Frozen`] the discriminator's parameters are
    /// identical before and after the call.
    pub fn update_generator(
        &mut self,
        generator: &Generator,
        discriminator: &mut Discriminator,
        batch: &ConditioningBatch,
        mode: DiscriminatorMode,
    ) -> f64 {
        let conditioned = Self::conditioned_fakes(generator, batch, true);
        let logits = discriminator.forward_t(&conditioned, true);
        let loss = generator_loss(&logits);

        self.optimizer.zero_grad();
        discriminator.zero_grad();
        loss.backward();
        self.optimizer.step();

        match mode {
            DiscriminatorMode::Frozen => discriminator.zero_grad(),
            DiscriminatorMode::Trainable => discriminator.apply_gradients(),
        }

        loss.double_value(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditioning::{LabelEncoder, LatentSampler};
    use crate::model::{DiscriminatorConfig, GeneratorConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tch::Device;

    fn snapshot(vs: &nn::VarStore) -> Vec<Tensor> {
        vs.trainable_variables().iter().map(|t| t.copy()).collect()
    }

    fn unchanged(before: &[Tensor], vs: &nn::VarStore) -> bool {
        before
            .iter()
            .zip(vs.trainable_variables().iter())
            .all(|(a, b)| a.equal(b))
    }

    fn setup() -> (Generator, Discriminator, CompositeTrainer, ConditioningBatch) {
        tch::manual_seed(5);
        let generator = Generator::new(GeneratorConfig::default(), Device::Cpu).unwrap();
        let discriminator = Discriminator::new(
            DiscriminatorConfig::default(),
            &OptimizerSettings::discriminator_default(),
            Device::Cpu,
        )
        .unwrap();
        let composite = CompositeTrainer::new(&generator, &OptimizerSettings::generator_default()).unwrap();

        let sampler = LatentSampler::new(30, 10);
        let encoder = LabelEncoder::new(10, 28, 28);
        let mut rng = StdRng::seed_from_u64(5);
        let batch = ConditioningBatch::random(&sampler, &encoder, &mut rng, 4, Device::Cpu).unwrap();

        (generator, discriminator, composite, batch)
    }

    #[test]
    fn test_frozen_update_leaves_discriminator_unchanged() {
        let (generator, mut discriminator, mut composite, batch) = setup();

        let disc_before = snapshot(discriminator.var_store());
        let gen_before = snapshot(generator.var_store());

        let loss = composite.update_generator(&generator, &mut discriminator, &batch, DiscriminatorMode::Frozen);

        assert!(loss.is_finite());
        assert!(unchanged(&disc_before, discriminator.var_store()));
        assert!(!unchanged(&gen_before, generator.var_store()));
    }

    #[test]
    fn test_trainable_update_moves_discriminator() {
        let (generator, mut discriminator, mut composite, batch) = setup();

        let disc_before = snapshot(discriminator.var_store());
        composite.update_generator(&generator, &mut discriminator, &batch, DiscriminatorMode::Trainable);

        assert!(!unchanged(&disc_before, discriminator.var_store()));
    }

    #[test]
    fn test_frozen_update_does_not_leak_gradients_into_next_disc_step() {
        let (generator, mut discriminator, mut composite, batch) = setup();

        composite.update_generator(&generator, &mut discriminator, &batch, DiscriminatorMode::Frozen);

        for var in discriminator.var_store().trainable_variables() {
            let grad = var.grad();
            if grad.defined() {
                assert_eq!(grad.abs().sum(tch::Kind::Float).double_value(&[]), 0.0);
            }
        }
    }
}

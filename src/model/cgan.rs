//! Conditional GAN wrapper combining Generator and Discriminator
//!
//! Provides the two alternating updates and label-conditioned generation.

use tch::{Device, Kind, Tensor};

use super::composite::{CompositeTrainer, DiscriminatorMode};
use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};
use super::optimizer::OptimizerSettings;
use crate::conditioning::{ConditioningBatch, LabelEncoder, LatentSampler};
use crate::error::{Error, Result};

/// Architecture and optimizer settings for both networks
#[derive(Debug, Clone, PartialEq)]
pub struct CganConfig {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
    pub generator_optimizer: OptimizerSettings,
    pub discriminator_optimizer: OptimizerSettings,
}

impl Default for CganConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            discriminator: DiscriminatorConfig::default(),
            generator_optimizer: OptimizerSettings::generator_default(),
            discriminator_optimizer: OptimizerSettings::discriminator_default(),
        }
    }
}

impl CganConfig {
    fn check(&self) -> Result<()> {
        let g = &self.generator;
        let d = &self.discriminator;
        if (g.height, g.width, g.class_num) != (d.height, d.width, d.class_num) {
            return Err(Error::InvalidConfig(format!(
                "generator produces {}x{} images for {} classes but discriminator expects {}x{} for {}",
                g.height, g.width, g.class_num, d.height, d.width, d.class_num
            )));
        }
        Ok(())
    }
}

/// Complete conditional GAN model
pub struct ConditionalGan {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    composite: CompositeTrainer,
    encoder: LabelEncoder,
    sampler: LatentSampler,
    device: Device,
}

impl ConditionalGan {
    /// Create a new model
    pub fn new(config: CganConfig, device: Device) -> Result<Self> {
        config.check()?;

        let g = &config.generator;
        let encoder = LabelEncoder::new(g.class_num as usize, g.height as usize, g.width as usize);
        let sampler = LatentSampler::new(g.z_dim as usize, g.class_num as usize);

        let generator = Generator::new(config.generator.clone(), device)?;
        let discriminator =
            Discriminator::new(config.discriminator.clone(), &config.discriminator_optimizer, device)?;
        let composite = CompositeTrainer::new(&generator, &config.generator_optimizer)?;

        Ok(Self {
            generator,
            discriminator,
            composite,
            encoder,
            sampler,
            device,
        })
    }

    /// Label encoder matching the model's image size and classes
    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    /// Noise and label sampler matching the model's latent size
    pub fn sampler(&self) -> &LatentSampler {
        &self.sampler
    }

    /// Device (CPU/GPU)
    pub fn device(&self) -> Device {
        self.device
    }

    /// Stack images of shape (batch, 1, H, W) with the label images of `labels`
    pub fn condition(&self, images: &Tensor, labels: &[i64]) -> Result<Tensor> {
        let label_images = self.encoder.channel_image_batch(labels, self.device)?;
        Ok(Tensor::cat(&[images, &label_images], 1))
    }

    /// Generate images for a conditioning batch in inference mode
    ///
    /// Returns a tensor of shape (batch, 1, H, W) with values in [-1, 1]
    pub fn generate(&self, batch: &ConditioningBatch) -> Tensor {
        tch::no_grad(|| self.generator.generate(&batch.noise, &batch.onehot))
    }

    /// Probability of each conditioned image being real
    pub fn discriminate(&self, conditioned: &Tensor) -> Tensor {
        tch::no_grad(|| self.discriminator.discriminate(conditioned))
    }

    /// One discriminator update on real images and generated images
    ///
    /// The combined batch is real samples first, then fakes; targets are ones
    /// for the real half and zeros for the fake half in the same order.
    pub fn train_discriminator(
        &mut self,
        real_images: &Tensor,
        real_labels: &[i64],
        fakes: &ConditioningBatch,
    ) -> Result<f64> {
        let real = self.condition(real_images, real_labels)?;
        let fake = tch::no_grad(|| CompositeTrainer::conditioned_fakes(&self.generator, fakes, false));

        let inputs = Tensor::cat(&[&real, &fake], 0);
        let targets = discriminator_targets(real_labels.len(), fakes.len(), self.device);

        Ok(self.discriminator.train_on_batch(&inputs, &targets))
    }

    /// One generator update through the frozen discriminator
    pub fn train_generator(&mut self, batch: &ConditioningBatch) -> f64 {
        self.composite.update_generator(
            &self.generator,
            &mut self.discriminator,
            batch,
            DiscriminatorMode::Frozen,
        )
    }

    /// Load generator weights, e.g. for sampling from a finished run
    pub fn load_generator(&mut self, gen_path: &str) -> Result<()> {
        self.generator.var_store_mut().load(gen_path)?;
        Ok(())
    }

    /// Latent dimension
    pub fn z_dim(&self) -> i64 {
        self.generator.config().z_dim
    }

    /// Number of classes
    pub fn class_num(&self) -> i64 {
        self.generator.config().class_num
    }

    /// Image (height, width)
    pub fn image_size(&self) -> (i64, i64) {
        let config = self.generator.config();
        (config.height, config.width)
    }
}

/// Ones for `real` rows followed by zeros for `fake` rows, shape (real + fake, 1)
fn discriminator_targets(real: usize, fake: usize, device: Device) -> Tensor {
    Tensor::cat(
        &[
            Tensor::ones([real as i64, 1], (Kind::Float, device)),
            Tensor::zeros([fake as i64, 1], (Kind::Float, device)),
        ],
        0,
    )
}

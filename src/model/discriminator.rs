//! Discriminator network for the conditional GAN
//!
//! The Discriminator scores a label-conditioned image as real or fake.
//! Input is the image stacked with its label channel image along the channel
//! axis, so depth is 1 + class_num.

use tch::{nn, nn::ModuleT, Device, Tensor};

use super::layers::{build_network, LayerSpec, Network, Padding, Shape};
use super::optimizer::OptimizerSettings;
use crate::error::Result;
use crate::training::losses::binary_cross_entropy;

/// Discriminator network configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorConfig {
    /// Input image height
    pub height: i64,
    /// Input image width
    pub width: i64,
    /// Number of classes (label channels)
    pub class_num: i64,
    /// Filters of the two convolution stages
    pub filters: (i64, i64),
    /// Units of the hidden dense layer
    pub hidden_units: i64,
    /// Convolution kernel size
    pub kernel_size: i64,
    /// Negative slope of the leaky ReLU
    pub leaky_slope: f64,
    /// Dropout rate
    pub dropout: f64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            height: 28,
            width: 28,
            class_num: 10,
            filters: (64, 128),
            hidden_units: 256,
            kernel_size: 5,
            leaky_slope: 0.2,
            dropout: 0.5,
        }
    }
}

impl DiscriminatorConfig {
    /// Layer configuration list
    ///
    /// Architecture:
    /// 1. Two stride-2 convolutions with LeakyReLU
    /// 2. Flatten -> Dense -> LeakyReLU -> Dropout
    /// 3. Dense to a single logit
    ///
    /// The sigmoid is applied by [`Discriminator::discriminate`] and folded
    /// into the loss during training.
    pub fn layers(&self) -> Vec<LayerSpec> {
        vec![
            LayerSpec::Conv2d {
                filters: self.filters.0,
                kernel: self.kernel_size,
                stride: 2,
                padding: Padding::Same,
            },
            LayerSpec::LeakyRelu {
                slope: self.leaky_slope,
            },
            LayerSpec::Conv2d {
                filters: self.filters.1,
                kernel: self.kernel_size,
                stride: 2,
                padding: Padding::Valid,
            },
            LayerSpec::LeakyRelu {
                slope: self.leaky_slope,
            },
            LayerSpec::Flatten,
            LayerSpec::Dense {
                units: self.hidden_units,
            },
            LayerSpec::LeakyRelu {
                slope: self.leaky_slope,
            },
            LayerSpec::Dropout { rate: self.dropout },
            LayerSpec::Dense { units: 1 },
        ]
    }

    /// Channels of the conditioned input
    pub fn input_channels(&self) -> i64 {
        1 + self.class_num
    }
}

/// Discriminator network
///
/// Owns its parameters and their optimizer. Trained directly through
/// [`Discriminator::train_on_batch`] and borrowed, never copied, by the
/// composite trainer.
pub struct Discriminator {
    config: DiscriminatorConfig,
    vs: nn::VarStore,
    net: Network,
    optimizer: nn::Optimizer,
}

impl Discriminator {
    /// Create a new Discriminator network on `device`
    pub fn new(
        config: DiscriminatorConfig,
        optimizer: &OptimizerSettings,
        device: Device,
    ) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let input = Shape::Spatial {
            channels: config.input_channels(),
            height: config.height,
            width: config.width,
        };
        let net = build_network(&vs.root(), input, &config.layers())?;
        let optimizer = optimizer.build(&vs)?;

        Ok(Self {
            config,
            vs,
            net,
            optimizer,
        })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `conditioned` - Tensor of shape (batch_size, 1 + class_num, height, width)
    /// * `train` - Whether in training mode (affects dropout)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with logits (not sigmoid)
    pub fn forward_t(&self, conditioned: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(conditioned, train)
    }

    /// Probability of each conditioned image being real (inference mode)
    pub fn discriminate(&self, conditioned: &Tensor) -> Tensor {
        self.forward_t(conditioned, false).sigmoid()
    }

    /// One optimizer step on a labelled batch, returns the loss
    ///
    /// `targets` has shape (batch_size, 1) with 1 for real and 0 for fake.
    pub fn train_on_batch(&mut self, conditioned: &Tensor, targets: &Tensor) -> f64 {
        let logits = self.forward_t(conditioned, true);
        let loss = binary_cross_entropy(&logits, targets);

        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.step();

        loss.double_value(&[])
    }

    /// Drop gradients accumulated on discriminator parameters
    pub(crate) fn zero_grad(&mut self) {
        self.optimizer.zero_grad();
    }

    /// Apply the currently accumulated gradients
    pub(crate) fn apply_gradients(&mut self) {
        self.optimizer.step();
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }

    /// Parameter store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Mutable parameter store, used to load weights
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    fn settings() -> OptimizerSettings {
        OptimizerSettings {
            learning_rate: 1e-3,
            beta1: 0.5,
            beta2: 0.999,
        }
    }

    #[test]
    fn test_discriminator_output_shape() {
        tch::manual_seed(0);
        let disc = Discriminator::new(DiscriminatorConfig::default(), &settings(), Device::Cpu).unwrap();

        let input = Tensor::randn([4, 11, 28, 28], (Kind::Float, Device::Cpu));
        let output = disc.forward_t(&input, false);

        assert_eq!(output.size(), vec![4, 1]);
    }

    #[test]
    fn test_discriminate_returns_probabilities() {
        tch::manual_seed(0);
        let disc = Discriminator::new(DiscriminatorConfig::default(), &settings(), Device::Cpu).unwrap();

        let input = Tensor::randn([6, 11, 28, 28], (Kind::Float, Device::Cpu)) * 10.0;
        let probs = disc.discriminate(&input);

        let min_val: f64 = probs.min().double_value(&[]);
        let max_val: f64 = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }

    #[test]
    fn test_train_on_batch_updates_parameters() {
        tch::manual_seed(2);
        let mut disc = Discriminator::new(DiscriminatorConfig::default(), &settings(), Device::Cpu).unwrap();

        let before: Vec<Tensor> = disc.var_store().trainable_variables().iter().map(|t| t.copy()).collect();

        let input = Tensor::randn([4, 11, 28, 28], (Kind::Float, Device::Cpu));
        let targets = Tensor::from_slice(&[1.0f32, 1.0, 0.0, 0.0]).view([4, 1]);
        let loss = disc.train_on_batch(&input, &targets);
        assert!(loss.is_finite());

        let after = disc.var_store().trainable_variables();
        assert!(before.iter().zip(after.iter()).any(|(a, b)| !a.equal(b)));
    }
}

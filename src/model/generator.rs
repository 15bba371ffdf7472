//! Generator network for the conditional GAN
//!
//! The Generator maps a noise vector and a one-hot label to a grayscale image.
//! Architecture upsamples a small feature map twice to reach full resolution.

use tch::{nn, nn::ModuleT, Device, Tensor};

use super::layers::{build_network, LayerSpec, Network, Padding, Shape};
use crate::error::{Error, Result};

/// Generator network configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub z_dim: i64,
    /// Number of classes (length of the one-hot label)
    pub class_num: i64,
    /// Output image height
    pub height: i64,
    /// Output image width
    pub width: i64,
    /// Units of the first dense layer
    pub hidden_units: i64,
    /// Channels of the initial feature map
    pub base_channels: i64,
    /// Channels after the first upsampling stage
    pub mid_channels: i64,
    /// Convolution kernel size
    pub kernel_size: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            z_dim: 30,
            class_num: 10,
            height: 28,
            width: 28,
            hidden_units: 1024,
            base_channels: 128,
            mid_channels: 64,
            kernel_size: 5,
        }
    }
}

impl GeneratorConfig {
    /// Layer configuration list
    ///
    /// Architecture:
    /// 1. Dense -> BatchNorm -> ReLU, twice, projecting to a (H/4, W/4) map
    /// 2. Upsample x2 -> Conv -> BatchNorm -> ReLU
    /// 3. Upsample x2 -> Conv to one channel -> Tanh
    pub fn layers(&self) -> Result<Vec<LayerSpec>> {
        if self.height % 4 != 0 || self.width % 4 != 0 {
            return Err(Error::Architecture(format!(
                "generator output {}x{} must be divisible by 4",
                self.height, self.width
            )));
        }
        let (h, w) = (self.height / 4, self.width / 4);

        Ok(vec![
            LayerSpec::Dense {
                units: self.hidden_units,
            },
            LayerSpec::BatchNorm,
            LayerSpec::Relu,
            LayerSpec::Dense {
                units: self.base_channels * h * w,
            },
            LayerSpec::BatchNorm,
            LayerSpec::Relu,
            LayerSpec::Reshape {
                channels: self.base_channels,
                height: h,
                width: w,
            },
            LayerSpec::Upsample { factor: 2 },
            LayerSpec::Conv2d {
                filters: self.mid_channels,
                kernel: self.kernel_size,
                stride: 1,
                padding: Padding::Same,
            },
            LayerSpec::BatchNorm,
            LayerSpec::Relu,
            LayerSpec::Upsample { factor: 2 },
            LayerSpec::Conv2d {
                filters: 1,
                kernel: self.kernel_size,
                stride: 1,
                padding: Padding::Same,
            },
            LayerSpec::Tanh,
        ])
    }
}

/// Generator network
///
/// Owns its parameters. Updates go through the composite trainer, which holds
/// the generator's optimizer.
pub struct Generator {
    config: GeneratorConfig,
    vs: nn::VarStore,
    net: Network,
}

impl Generator {
    /// Create a new Generator network on `device`
    pub fn new(config: GeneratorConfig, device: Device) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let input = Shape::Flat(config.z_dim + config.class_num);
        let net = build_network(&vs.root(), input, &config.layers()?)?;

        Ok(Self { config, vs, net })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, z_dim)
    /// * `onehot` - Tensor of shape (batch_size, class_num)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1, height, width) with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, onehot: &Tensor, train: bool) -> Tensor {
        let input = Tensor::cat(&[noise, onehot], 1);
        self.net.forward_t(&input, train)
    }

    /// Generate images (inference mode)
    pub fn generate(&self, noise: &Tensor, onehot: &Tensor) -> Tensor {
        self.forward_t(noise, onehot, false)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
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

    /// Device the parameters live on
    pub fn device(&self) -> Device {
        self.vs.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    #[test]
    fn test_generator_output_shape_and_range() {
        tch::manual_seed(0);
        let gen = Generator::new(GeneratorConfig::default(), Device::Cpu).unwrap();

        let noise = Tensor::rand([4, 30], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        let onehot = Tensor::eye(10, (Kind::Float, Device::Cpu)).narrow(0, 0, 4);
        let output = gen.generate(&noise, &onehot);

        assert_eq!(output.size(), vec![4, 1, 28, 28]);
        assert!(output.min().double_value(&[]) >= -1.0);
        assert!(output.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn test_generator_samples_independent_in_inference() {
        tch::manual_seed(1);
        let gen = Generator::new(GeneratorConfig::default(), Device::Cpu).unwrap();

        let noise = Tensor::rand([3, 30], (Kind::Float, Device::Cpu));
        let onehot = Tensor::eye(10, (Kind::Float, Device::Cpu)).narrow(0, 2, 3);
        let batched = gen.generate(&noise, &onehot);
        let single = gen.generate(&noise.narrow(0, 1, 1), &onehot.narrow(0, 1, 1));

        let diff = (batched.narrow(0, 1, 1) - single).abs().max().double_value(&[]);
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_generator_rejects_odd_resolution() {
        let config = GeneratorConfig {
            height: 30,
            ..Default::default()
        };
        assert!(Generator::new(config, Device::Cpu).is_err());
    }
}

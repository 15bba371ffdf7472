//! Configuration management
//!
//! Provides unified configuration for data loading, both networks and the
//! training loop. Files are TOML or JSON, picked by extension.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{CganConfig, DiscriminatorConfig, GeneratorConfig, OptimizerSettings};
use crate::training::TrainingConfig;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the MNIST IDX files
    pub data_dir: String,
    /// Use only the first N training images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_limit: Option<usize>,
}

/// Model-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Image width
    pub width: i64,
    /// Image height
    pub height: i64,
    /// Latent dimension size
    pub z_dim: i64,
    /// Number of digit classes
    pub class_num: i64,
    /// Width of the generator's first dense layer
    pub gen_hidden_units: i64,
    /// Channels after the generator's reshape
    pub gen_base_channels: i64,
    /// Channels of the generator's intermediate convolution
    pub gen_mid_channels: i64,
    /// Filters of the discriminator's two convolutions
    pub disc_filters: (i64, i64),
    /// Width of the discriminator's hidden dense layer
    pub disc_hidden_units: i64,
    /// Convolution kernel size for both networks
    pub kernel_size: i64,
    /// LeakyReLU negative slope
    pub leaky_slope: f64,
    /// Dropout rate for discriminator
    pub dropout: f64,
}

/// Training-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    /// Number of epochs
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Render a sample grid every N batches
    pub sample_every: usize,
    /// Seed for torch and the sampling RNG
    pub seed: u64,
    /// Generator optimizer
    pub gen_optimizer: OptimizerSettings,
    /// Discriminator optimizer
    pub disc_optimizer: OptimizerSettings,
    /// Directory for sample grids
    pub image_output_path: String,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        let gen = GeneratorConfig::default();
        let disc = DiscriminatorConfig::default();
        Self {
            data: DataConfig {
                data_dir: "data".to_string(),
                train_limit: None,
            },
            model: ModelConfig {
                width: gen.width,
                height: gen.height,
                z_dim: gen.z_dim,
                class_num: gen.class_num,
                gen_hidden_units: gen.hidden_units,
                gen_base_channels: gen.base_channels,
                gen_mid_channels: gen.mid_channels,
                disc_filters: disc.filters,
                disc_hidden_units: disc.hidden_units,
                kernel_size: gen.kernel_size,
                leaky_slope: disc.leaky_slope,
                dropout: disc.dropout,
            },
            training: TrainingConfigFile {
                epochs: 50,
                batch_size: 32,
                sample_every: 500,
                seed: 42,
                gen_optimizer: OptimizerSettings::generator_default(),
                disc_optimizer: OptimizerSettings::discriminator_default(),
                image_output_path: "generated_images".to_string(),
                checkpoint_dir: "checkpoints".to_string(),
                device: "cpu".to_string(),
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let m = &self.model;
        let t = &self.training;

        if m.width <= 0 || m.height <= 0 {
            return invalid("Image size must be > 0");
        }
        if m.width % 4 != 0 || m.height % 4 != 0 {
            return invalid("Image width and height must be divisible by 4");
        }
        if m.z_dim <= 0 {
            return invalid("Latent dimension must be > 0");
        }
        if m.class_num <= 0 {
            return invalid("Number of classes must be > 0");
        }
        if !(0.0..1.0).contains(&m.dropout) {
            return invalid("Dropout must be in [0, 1)");
        }
        if t.epochs == 0 {
            return invalid("Number of epochs must be > 0");
        }
        if t.batch_size == 0 {
            return invalid("Batch size must be > 0");
        }
        if t.sample_every == 0 {
            return invalid("Sample interval must be > 0");
        }
        if t.gen_optimizer.learning_rate <= 0.0 || t.disc_optimizer.learning_rate <= 0.0 {
            return invalid("Learning rates must be > 0");
        }
        Ok(())
    }

    /// Architecture and optimizer settings for the model
    pub fn model_config(&self) -> CganConfig {
        let m = &self.model;
        CganConfig {
            generator: GeneratorConfig {
                z_dim: m.z_dim,
                class_num: m.class_num,
                height: m.height,
                width: m.width,
                hidden_units: m.gen_hidden_units,
                base_channels: m.gen_base_channels,
                mid_channels: m.gen_mid_channels,
                kernel_size: m.kernel_size,
            },
            discriminator: DiscriminatorConfig {
                height: m.height,
                width: m.width,
                class_num: m.class_num,
                filters: m.disc_filters,
                hidden_units: m.disc_hidden_units,
                kernel_size: m.kernel_size,
                leaky_slope: m.leaky_slope,
                dropout: m.dropout,
            },
            generator_optimizer: self.training.gen_optimizer,
            discriminator_optimizer: self.training.disc_optimizer,
        }
    }

    /// Settings for the training loop
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.training.epochs,
            sample_every: self.training.sample_every,
            seed: self.training.seed,
            ..TrainingConfig::default()
        }
    }

    /// Where the per-epoch metrics CSV goes
    pub fn metrics_path(&self) -> PathBuf {
        Path::new(&self.training.checkpoint_dir).join("training_metrics.csv")
    }
}

fn invalid(msg: &str) -> Result<()> {
    Err(Error::InvalidConfig(msg.to_string()))
}

/// Create default configuration file if it doesn't exist
pub fn ensure_config_exists(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        if path.ends_with(".toml") {
            Config::from_toml(path)
        } else {
            Config::from_json(path)
        }
    } else {
        let config = Config::default();
        if path.ends_with(".toml") {
            config.save_toml(path)?;
        } else {
            config.save_json(path)?;
        }
        Ok(config)
    }
}

//! # Conditional GAN for handwritten digits
//!
//! This crate trains a label-conditioned generative adversarial network on
//! MNIST and generates digits of a requested class.
//!
//! ## Modules
//!
//! - `conditioning`: Label one-hot / channel-image encoding and noise sampling
//! - `data`: MNIST IDX loading, normalization and batching
//! - `model`: Generator, Discriminator and the composite generator update
//! - `training`: Training loop and loss functions
//! - `utils`: Configuration, checkpoints and sample grids

pub mod conditioning;
pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use conditioning::{ConditioningBatch, LabelEncoder, LatentSampler};
pub use data::{DataLoader, MnistDataset};
pub use error::{Error, Result};
pub use model::{CganConfig, CompositeTrainer, ConditionalGan, Discriminator, DiscriminatorMode, Generator};
pub use training::{Trainer, TrainingConfig, TrainingMetrics, TrainingState};
pub use utils::{Config, FileCheckpointWriter, PngSampleWriter};

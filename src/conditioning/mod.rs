//! Label conditioning for both networks
//!
//! This module provides:
//! - Label encoder producing one-hot vectors and label channel images
//! - Noise/label sampling and batched generator inputs

mod encoder;
mod sampler;

pub use encoder::LabelEncoder;
pub use sampler::{ConditioningBatch, LatentSampler};

//! Training module for the conditional GAN
//!
//! This module provides:
//! - Training loop state machine
//! - Loss functions (binary cross-entropy on logits)
//! - Per-epoch metrics and CSV export

pub mod losses;
mod metrics;
mod trainer;

pub use losses::{binary_cross_entropy, generator_loss};
pub use metrics::{EMATracker, EpochStats, TrainingMetrics};
pub use trainer::{BatchLosses, Trainer, TrainingConfig, TrainingState};

//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Per-epoch checkpoint writing
//! - Sample grid rendering

mod checkpoint;
mod config;
pub mod visualization;

pub use checkpoint::{
    load_checkpoint_meta, CheckpointMeta, CheckpointWriter, FileCheckpointWriter, ModelSnapshot,
    DISCRIMINATOR_FILE, GENERATOR_FILE, META_FILE,
};
pub use config::{ensure_config_exists, Config, DataConfig, ModelConfig, TrainingConfigFile};
pub use visualization::{render_grid, PngSampleWriter, SampleWriter};

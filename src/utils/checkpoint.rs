//! Checkpoint writing
//!
//! After every epoch the trainer hands both parameter stores to a
//! [`CheckpointWriter`]. The file writer keeps a single checkpoint per run:
//! `generator.pt` and `discriminator.pt` are overwritten each epoch and
//! `meta.json` records which epoch they belong to.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::nn::VarStore;

use crate::error::Result;

/// File name of the generator weights
pub const GENERATOR_FILE: &str = "generator.pt";
/// File name of the discriminator weights
pub const DISCRIMINATOR_FILE: &str = "discriminator.pt";
/// File name of the checkpoint metadata
pub const META_FILE: &str = "meta.json";

/// Named parameter stores handed to a checkpoint writer
pub struct ModelSnapshot<'a> {
    /// Epoch that just finished (0-based)
    pub epoch: usize,
    pub generator: &'a VarStore,
    pub discriminator: &'a VarStore,
    /// Mean generator loss of the epoch
    pub gen_loss: f64,
    /// Mean discriminator loss of the epoch
    pub disc_loss: f64,
    /// (z_dim, class_num, height, width) of the model
    pub shape: (i64, i64, i64, i64),
}

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch that produced the weights
    pub epoch: usize,
    /// Generator loss at checkpoint
    pub gen_loss: f64,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    pub z_dim: i64,
    pub class_num: i64,
    pub height: i64,
    pub width: i64,
}

/// Destination for per-epoch parameter snapshots
pub trait CheckpointWriter {
    /// Persist both networks
    fn write(&mut self, snapshot: &ModelSnapshot<'_>) -> Result<()>;
}

/// Writes the latest snapshot into a directory, overwriting the previous one
#[derive(Debug, Clone)]
pub struct FileCheckpointWriter {
    dir: PathBuf,
}

impl FileCheckpointWriter {
    /// Create a writer for `dir`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the generator weights
    pub fn generator_path(&self) -> PathBuf {
        self.dir.join(GENERATOR_FILE)
    }

    /// Path of the discriminator weights
    pub fn discriminator_path(&self) -> PathBuf {
        self.dir.join(DISCRIMINATOR_FILE)
    }
}

impl CheckpointWriter for FileCheckpointWriter {
    fn write(&mut self, snapshot: &ModelSnapshot<'_>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        snapshot.generator.save(self.generator_path())?;
        snapshot.discriminator.save(self.discriminator_path())?;

        let (z_dim, class_num, height, width) = snapshot.shape;
        let meta = CheckpointMeta {
            epoch: snapshot.epoch,
            gen_loss: snapshot.gen_loss,
            disc_loss: snapshot.disc_loss,
            timestamp: chrono::Utc::now().to_rfc3339(),
            z_dim,
            class_num,
            height,
            width,
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(self.dir.join(META_FILE), meta_json)?;

        tracing::info!("Saved checkpoint for epoch {} to {}", snapshot.epoch, self.dir.display());
        Ok(())
    }
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta<P: AsRef<Path>>(dir: P) -> Result<CheckpointMeta> {
    let content = std::fs::read_to_string(dir.as_ref().join(META_FILE))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn, Device};

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            epoch: 10,
            gen_loss: 0.5,
            disc_loss: 0.6,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            z_dim: 30,
            class_num: 10,
            height: 28,
            width: 28,
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(meta.epoch, loaded.epoch);
        assert_eq!(loaded.z_dim, 30);
    }

    #[test]
    fn test_file_writer_overwrites_each_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileCheckpointWriter::new(dir.path().join("ckpt"));

        let gen_vs = nn::VarStore::new(Device::Cpu);
        let _ = nn::linear(gen_vs.root() / "fc", 3, 2, Default::default());
        let disc_vs = nn::VarStore::new(Device::Cpu);
        let _ = nn::linear(disc_vs.root() / "fc", 2, 1, Default::default());

        for epoch in 0..2 {
            let snapshot = ModelSnapshot {
                epoch,
                generator: &gen_vs,
                discriminator: &disc_vs,
                gen_loss: 1.0,
                disc_loss: 0.5,
                shape: (30, 10, 28, 28),
            };
            writer.write(&snapshot).unwrap();
        }

        assert!(writer.generator_path().exists());
        assert!(writer.discriminator_path().exists());

        let meta = load_checkpoint_meta(dir.path().join("ckpt")).unwrap();
        assert_eq!(meta.epoch, 1);

        let entries = std::fs::read_dir(dir.path().join("ckpt")).unwrap().count();
        assert_eq!(entries, 3);
    }
}

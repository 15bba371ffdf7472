//! Training loop for the conditional GAN
//!
//! Every batch runs one discriminator update on real-then-fake conditioned
//! images followed by one generator update through the frozen
//! discriminator. Every `sample_every` batches a sample grid is rendered
//! before that batch's updates, and both networks are checkpointed after
//! every epoch.

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::metrics::{EMATracker, EpochStats, TrainingMetrics};
use crate::conditioning::ConditioningBatch;
use crate::data::{Batch, DataLoader};
use crate::error::{Error, Result};
use crate::model::ConditionalGan;
use crate::utils::visualization::{render_grid, SampleWriter};
use crate::utils::{CheckpointWriter, ModelSnapshot};

/// Training configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Render a sample grid every N batches, counted by batch index
    pub sample_every: usize,
    /// Seed for noise, random labels and visualization noise
    pub seed: u64,
    /// Epochs averaged by the mode-collapse heuristic
    pub collapse_window: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            sample_every: 500,
            seed: 42,
            collapse_window: 10,
        }
    }
}

/// Where the training loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Idle,
    ForEpoch { epoch: usize },
    ForBatch { epoch: usize, batch: usize },
    UpdateDiscriminator { epoch: usize, batch: usize },
    UpdateGenerator { epoch: usize, batch: usize },
    MaybeVisualize { epoch: usize, batch: usize },
    EpochCheckpoint { epoch: usize },
    Done,
}

/// Losses of one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchLosses {
    pub disc_loss: f64,
    pub gen_loss: f64,
}

/// Conditional GAN trainer
pub struct Trainer {
    config: TrainingConfig,
    rng: StdRng,
    metrics: TrainingMetrics,
    state: TrainingState,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            metrics: TrainingMetrics::new(),
            state: TrainingState::Idle,
        }
    }

    /// Train the model over `loader` for the configured number of epochs
    ///
    /// Any error (an invalid label in the data, a failed write) aborts the run.
    pub fn train(
        &mut self,
        model: &mut ConditionalGan,
        loader: &mut DataLoader,
        samples: &mut dyn SampleWriter,
        checkpoints: &mut dyn CheckpointWriter,
    ) -> Result<&TrainingMetrics> {
        if self.config.sample_every == 0 {
            return Err(Error::InvalidConfig("sample_every must be > 0".to_string()));
        }
        if loader.batch_size() == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_string()));
        }

        let (height, width) = model.image_size();
        if (loader.height() as i64, loader.width() as i64) != (height, width) {
            return Err(Error::InvalidConfig(format!(
                "data has {}x{} images but the model expects {}x{}",
                loader.height(),
                loader.width(),
                height,
                width
            )));
        }

        let num_batches = loader.num_batches();
        if num_batches == 0 {
            return Err(Error::Dataset(format!(
                "{} samples do not fill a single batch of {}",
                loader.num_samples(),
                loader.batch_size()
            )));
        }
        let batch_size = loader.batch_size();

        info!(
            "Starting training for {} epochs, {} batches per epoch",
            self.config.epochs, num_batches
        );

        for epoch in 0..self.config.epochs {
            self.state = TrainingState::ForEpoch { epoch };
            let mut stats = EpochStats::new();
            let mut gen_ema = EMATracker::new(0.1);
            let mut disc_ema = EMATracker::new(0.1);
            let pb = progress_bar(num_batches as u64);

            for (batch, real) in loader.iter().enumerate() {
                self.state = TrainingState::ForBatch { epoch, batch };

                // Grids show the generator as it was before this batch's updates
                self.state = TrainingState::MaybeVisualize { epoch, batch };
                if batch % self.config.sample_every == 0 {
                    let path = self.visualize(model, samples, batch_size, epoch, batch)?;
                    debug!("Wrote samples to {}", path.display());
                }

                let losses = self.train_batch(model, &real, epoch, batch)?;

                if stats.push(losses.disc_loss, losses.gen_loss) {
                    gen_ema.update(losses.gen_loss);
                    disc_ema.update(losses.disc_loss);
                } else {
                    warn!(
                        "Non-finite loss at epoch {} batch {}: D_loss={}, G_loss={}",
                        epoch, batch, losses.disc_loss, losses.gen_loss
                    );
                }
                debug!(
                    "epoch={} batch={} D_loss={:.4} G_loss={:.4}",
                    epoch, batch, losses.disc_loss, losses.gen_loss
                );

                pb.set_message(format!("G: {:.4}, D: {:.4}", gen_ema.value(), disc_ema.value()));
                pb.inc(1);
            }

            pb.finish_with_message("done");
            self.metrics.record_epoch(&stats);

            info!(
                "Epoch {}/{}: G_loss={:.4}, D_loss={:.4}",
                epoch + 1,
                self.config.epochs,
                stats.mean_gen_loss(),
                stats.mean_disc_loss()
            );

            if self.metrics.check_mode_collapse(self.config.collapse_window) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            }

            self.state = TrainingState::EpochCheckpoint { epoch };
            let (height, width) = model.image_size();
            checkpoints.write(&ModelSnapshot {
                epoch,
                generator: model.generator.var_store(),
                discriminator: model.discriminator.var_store(),
                gen_loss: stats.mean_gen_loss(),
                disc_loss: stats.mean_disc_loss(),
                shape: (model.z_dim(), model.class_num(), height, width),
            })?;
        }

        self.state = TrainingState::Done;
        info!("Training finished after {} epochs", self.config.epochs);
        Ok(&self.metrics)
    }

    /// One discriminator update followed by one generator update
    pub fn train_batch(
        &mut self,
        model: &mut ConditionalGan,
        real: &Batch,
        epoch: usize,
        batch: usize,
    ) -> Result<BatchLosses> {
        let device = model.device();
        let batch_size = real.len();

        self.state = TrainingState::UpdateDiscriminator { epoch, batch };
        let fakes = ConditioningBatch::random(
            model.sampler(),
            model.encoder(),
            &mut self.rng,
            batch_size,
            device,
        )?;
        let real_images = real.images_tensor(device);
        let disc_loss = model.train_discriminator(&real_images, &real.labels, &fakes)?;

        self.state = TrainingState::UpdateGenerator { epoch, batch };
        let fresh = ConditioningBatch::random(
            model.sampler(),
            model.encoder(),
            &mut self.rng,
            batch_size,
            device,
        )?;
        let gen_loss = model.train_generator(&fresh);

        Ok(BatchLosses { disc_loss, gen_loss })
    }

    /// Render one grid of `batch_size` samples with cycling labels
    fn visualize(
        &mut self,
        model: &ConditionalGan,
        samples: &mut dyn SampleWriter,
        batch_size: usize,
        epoch: usize,
        batch: usize,
    ) -> Result<PathBuf> {
        let inputs = ConditioningBatch::cycling(
            model.sampler(),
            model.encoder(),
            &mut self.rng,
            batch_size,
            model.device(),
        )?;
        let images = model.generate(&inputs);
        let grid = render_grid(&images)?;
        samples.write_grid(&grid, epoch, batch)
    }

    /// Current position in the training loop
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CganConfig, DiscriminatorConfig, GeneratorConfig};
    use ndarray::{Array1, Array2, Array3};
    use tch::Device;

    fn tiny_model() -> ConditionalGan {
        tch::manual_seed(11);
        let config = CganConfig {
            generator: GeneratorConfig {
                z_dim: 4,
                class_num: 3,
                height: 8,
                width: 8,
                hidden_units: 16,
                base_channels: 8,
                mid_channels: 4,
                kernel_size: 3,
            },
            discriminator: DiscriminatorConfig {
                height: 8,
                width: 8,
                class_num: 3,
                filters: (4, 8),
                hidden_units: 8,
                kernel_size: 3,
                leaky_slope: 0.2,
                dropout: 0.5,
            },
            ..CganConfig::default()
        };
        ConditionalGan::new(config, Device::Cpu).unwrap()
    }

    fn loader(labels: Vec<i64>, batch_size: usize) -> DataLoader {
        let n = labels.len();
        let images = Array3::from_shape_fn((n, 8, 8), |(i, r, c)| {
            (((i + r * 3 + c) % 17) as f32 / 8.0) - 1.0
        });
        DataLoader::new(images, Array1::from(labels), batch_size, true, true, 5)
    }

    #[derive(Default)]
    struct RecordingSamples {
        grids: Vec<(usize, usize, (usize, usize))>,
        pixels: Vec<Array2<u8>>,
    }

    impl SampleWriter for RecordingSamples {
        fn write_grid(&mut self, grid: &Array2<u8>, epoch: usize, batch: usize) -> Result<PathBuf> {
            self.grids.push((epoch, batch, grid.dim()));
            self.pixels.push(grid.clone());
            Ok(PathBuf::from(format!("{epoch}_{batch}")))
        }
    }

    #[derive(Default)]
    struct RecordingCheckpoints {
        epochs: Vec<usize>,
    }

    impl CheckpointWriter for RecordingCheckpoints {
        fn write(&mut self, snapshot: &ModelSnapshot<'_>) -> Result<()> {
            assert_eq!(snapshot.shape, (4, 3, 8, 8));
            self.epochs.push(snapshot.epoch);
            Ok(())
        }
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.sample_every, 500);
    }

    #[test]
    fn test_full_run_reaches_done() {
        let mut model = tiny_model();
        let mut data = loader(vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0], 4);
        let mut samples = RecordingSamples::default();
        let mut checkpoints = RecordingCheckpoints::default();

        let mut trainer = Trainer::new(TrainingConfig {
            epochs: 2,
            sample_every: 1,
            seed: 1,
            collapse_window: 10,
        });
        assert_eq!(trainer.state(), TrainingState::Idle);

        let metrics = trainer
            .train(&mut model, &mut data, &mut samples, &mut checkpoints)
            .unwrap();
        assert_eq!(metrics.num_epochs(), 2);
        assert!(metrics.latest_gen_loss().unwrap().is_finite());
        assert!(metrics.latest_disc_loss().unwrap().is_finite());

        assert_eq!(trainer.state(), TrainingState::Done);
        assert_eq!(checkpoints.epochs, vec![0, 1]);
        // 10 samples / 4 per batch -> 2 batches, a grid at each
        let written: Vec<_> = samples.grids.iter().map(|&(e, b, _)| (e, b)).collect();
        assert_eq!(written, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        // 4 samples tile into 2x2
        assert!(samples.grids.iter().all(|&(_, _, dim)| dim == (16, 16)));
    }

    #[test]
    fn test_sample_interval_counts_batch_index() {
        let mut model = tiny_model();
        let mut data = loader(vec![0; 12], 2);
        let mut samples = RecordingSamples::default();
        let mut checkpoints = RecordingCheckpoints::default();

        let mut trainer = Trainer::new(TrainingConfig {
            epochs: 1,
            sample_every: 4,
            ..TrainingConfig::default()
        });
        trainer
            .train(&mut model, &mut data, &mut samples, &mut checkpoints)
            .unwrap();

        let batches: Vec<_> = samples.grids.iter().map(|&(_, b, _)| b).collect();
        assert_eq!(batches, vec![0, 4]);
    }

    #[test]
    fn test_invalid_label_aborts_run() {
        let mut model = tiny_model();
        let mut data = loader(vec![0, 7, 1, 2], 4);
        let mut samples = RecordingSamples::default();
        let mut checkpoints = RecordingCheckpoints::default();

        let mut trainer = Trainer::new(TrainingConfig::default());
        let err = trainer
            .train(&mut model, &mut data, &mut samples, &mut checkpoints)
            .unwrap_err();

        assert!(err.is_invalid_label());
        assert!(checkpoints.epochs.is_empty());
        assert_eq!(
            trainer.state(),
            TrainingState::UpdateDiscriminator { epoch: 0, batch: 0 }
        );
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let mut model = tiny_model();
        let mut data = loader(vec![0, 1, 2], 4);
        let mut trainer = Trainer::new(TrainingConfig::default());

        let result = trainer.train(
            &mut model,
            &mut data,
            &mut RecordingSamples::default(),
            &mut RecordingCheckpoints::default(),
        );
        assert!(matches!(result, Err(Error::Dataset(_))));
    }

    #[test]
    fn test_first_grid_shows_untrained_generator() {
        let mut model = tiny_model();
        let untouched = tiny_model();
        let mut data = loader(vec![0, 1, 2, 0, 1, 2, 0, 1], 4);
        let mut samples = RecordingSamples::default();

        let config = TrainingConfig {
            epochs: 1,
            sample_every: 1,
            seed: 3,
            collapse_window: 10,
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let inputs =
            ConditioningBatch::cycling(untouched.sampler(), untouched.encoder(), &mut rng, 4, Device::Cpu)
                .unwrap();
        let expected = render_grid(&untouched.generate(&inputs)).unwrap();

        let mut trainer = Trainer::new(config);
        trainer
            .train(&mut model, &mut data, &mut samples, &mut RecordingCheckpoints::default())
            .unwrap();

        assert_eq!(samples.pixels.len(), 2);
        assert_eq!(samples.pixels[0], expected);
    }

    #[test]
    fn test_zero_sample_interval_rejected() {
        let mut model = tiny_model();
        let mut data = loader(vec![0, 1, 2, 0], 2);
        let mut trainer = Trainer::new(TrainingConfig {
            sample_every: 0,
            ..TrainingConfig::default()
        });

        let result = trainer.train(
            &mut model,
            &mut data,
            &mut RecordingSamples::default(),
            &mut RecordingCheckpoints::default(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert_eq!(trainer.state(), TrainingState::Idle);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut model = tiny_model();
        let mut data = loader(vec![0, 1, 2, 0], 0);
        let mut trainer = Trainer::new(TrainingConfig::default());

        let result = trainer.train(
            &mut model,
            &mut data,
            &mut RecordingSamples::default(),
            &mut RecordingCheckpoints::default(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}

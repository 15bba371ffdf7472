//! Training metrics for monitoring GAN progress
//!
//! Provides structures for tracking and logging training progress.

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Mean generator loss per epoch
    pub gen_losses: Vec<f64>,
    /// Mean discriminator loss per epoch
    pub disc_losses: Vec<f64>,
    /// Batches per epoch with a NaN or infinite loss
    pub non_finite_batches: Vec<usize>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the summary of a finished epoch
    pub fn record_epoch(&mut self, stats: &EpochStats) {
        self.gen_losses.push(stats.mean_gen_loss());
        self.disc_losses.push(stats.mean_disc_loss());
        self.non_finite_batches.push(stats.non_finite);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.gen_losses.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Get latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.disc_losses.last().copied()
    }

    /// Calculate moving average of generator loss
    pub fn gen_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.gen_losses, window)
    }

    /// Calculate moving average of discriminator loss
    pub fn disc_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.disc_losses, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Mode collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Generator loss very high (can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }

        let disc_ma = self.disc_loss_ma(window);
        let gen_ma = self.gen_loss_ma(window);

        // Heuristic thresholds for mode collapse detection
        disc_ma < 0.1 && gen_ma > 5.0
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: &str) -> crate::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "gen_loss", "disc_loss", "non_finite_batches"])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.gen_losses[i].to_string(),
                self.disc_losses[i].to_string(),
                self.non_finite_batches[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Running sums over the batches of one epoch
#[derive(Debug, Clone, Default)]
pub struct EpochStats {
    gen_sum: f64,
    disc_sum: f64,
    finite: usize,
    /// Batches where either loss was NaN or infinite
    pub non_finite: usize,
}

impl EpochStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the two losses of one batch, returns false if either is not finite
    ///
    /// Non-finite batches are counted but left out of the means.
    pub fn push(&mut self, disc_loss: f64, gen_loss: f64) -> bool {
        if disc_loss.is_finite() && gen_loss.is_finite() {
            self.disc_sum += disc_loss;
            self.gen_sum += gen_loss;
            self.finite += 1;
            true
        } else {
            self.non_finite += 1;
            false
        }
    }

    /// Number of batches seen
    pub fn batches(&self) -> usize {
        self.finite + self.non_finite
    }

    /// Mean generator loss over finite batches, NaN if there were none
    pub fn mean_gen_loss(&self) -> f64 {
        self.gen_sum / self.finite as f64
    }

    /// Mean discriminator loss over finite batches, NaN if there were none
    pub fn mean_disc_loss(&self) -> f64 {
        self.disc_sum / self.finite as f64
    }
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EMATracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EMATracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

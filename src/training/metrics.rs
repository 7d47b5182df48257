//! Training metrics for monitoring WGAN progress
//!
//! Provides structures for tracking and logging training progress.

use std::path::Path;

use crate::error::Result;

/// Metrics collected during training, one entry per epoch
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Critic losses (including the penalty term) at the last critic step
    pub critic_losses: Vec<f64>,
    /// Generator losses at the last generator step
    pub gen_losses: Vec<f64>,
    /// Mean gradient penalty over the epoch's critic steps
    pub penalties: Vec<f64>,
    /// Mean Wasserstein estimate E[C(x)] - E[C(G(z))] over the epoch
    pub wasserstein: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, critic_loss: f64, gen_loss: f64, penalty: f64, wasserstein: f64) {
        self.critic_losses.push(critic_loss);
        self.gen_losses.push(gen_loss);
        self.penalties.push(penalty);
        self.wasserstein.push(wasserstein);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.critic_losses.len()
    }

    /// Get latest critic loss
    pub fn latest_critic_loss(&self) -> Option<f64> {
        self.critic_losses.last().copied()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Moving average of the Wasserstein estimate
    pub fn wasserstein_ma(&self, window: usize) -> f64 {
        moving_average(&self.wasserstein, window)
    }

    /// Moving average of the gradient penalty
    pub fn penalty_ma(&self, window: usize) -> f64 {
        moving_average(&self.penalties, window)
    }

    /// Check whether the critic has drifted away from the Lipschitz constraint
    ///
    /// A penalty that stays well above 1 means gradient norms far from 1,
    /// typically because the learning rate is too high for `lambda_gp`.
    pub fn check_lipschitz_drift(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }
        self.penalty_ma(window) > 1.0
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "critic_loss", "gen_loss", "penalty", "wasserstein"])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                i.to_string(),
                self.critic_losses[i].to_string(),
                self.gen_losses[i].to_string(),
                self.penalties[i].to_string(),
                self.wasserstein[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
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

    let n = window.max(1).min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

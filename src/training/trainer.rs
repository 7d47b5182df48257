//! Training loop implementation for WGAN-GP
//!
//! Every mini-batch runs one critic update; every `n_critic`-th mini-batch
//! (counting from the first batch of each epoch) additionally runs one
//! generator update, strictly after the critic update of that batch.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tch::{nn, Device, Kind, Tensor};
use tracing::{debug, info, warn};

use super::losses::{critic_loss, generator_loss, gradient_penalty};
use super::metrics::{EMATracker, TrainingMetrics};
use crate::data::pixels::make_grid;
use crate::data::DataLoader;
use crate::error::{Result, StegoGanError};
use crate::model::Wgan;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Mini-batch size
    pub batch_size: usize,
    /// Learning rate shared by both optimizers
    pub lr: f64,
    /// Run a generator update every `n_critic` mini-batches
    pub n_critic: usize,
    /// Weight of the gradient penalty in the critic loss
    pub lambda_gp: f64,
    /// Emit a sample grid every N epochs (epoch 0 included)
    pub sample_every: usize,
    /// Number of images in each sample grid
    pub sample_count: i64,
    /// Side length training images are resized to
    pub image_size: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            latent_dim: 100,
            batch_size: 64,
            lr: 1e-4,
            n_critic: 5,
            lambda_gp: 10.0,
            sample_every: 10,
            sample_count: 16,
            image_size: 64,
        }
    }
}

impl TrainingConfig {
    /// Check every hyperparameter against its domain
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(StegoGanError::InvalidConfig(msg.to_string()));

        if self.epochs == 0 {
            return invalid("epochs must be > 0");
        }
        if self.latent_dim <= 0 {
            return invalid("latent_dim must be > 0");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be > 0");
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return invalid("lr must be a finite value > 0");
        }
        if self.n_critic == 0 {
            return invalid("n_critic must be > 0");
        }
        if !(self.lambda_gp.is_finite() && self.lambda_gp >= 0.0) {
            return invalid("lambda_gp must be a finite value >= 0");
        }
        if self.sample_every == 0 || self.sample_count <= 0 {
            return invalid("sample_every and sample_count must be > 0");
        }
        if self.image_size != 64 {
            return invalid("image_size must be 64");
        }
        Ok(())
    }
}

/// Statistics of one critic update
#[derive(Debug, Clone, Copy)]
pub struct CriticStep {
    /// Full critic loss including the weighted penalty
    pub loss: f64,
    /// Unweighted gradient penalty
    pub penalty: f64,
    /// E[C(x)] - E[C(G(z))]
    pub wasserstein: f64,
}

/// WGAN-GP Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
    sample_paths: Vec<PathBuf>,
    critic_steps: usize,
    generator_steps: usize,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
            sample_paths: Vec::new(),
            critic_steps: 0,
            generator_steps: 0,
        }
    }

    /// Train the WGAN model
    ///
    /// # Arguments
    ///
    /// * `model` - WGAN model to train
    /// * `data_loader` - DataLoader providing training batches
    /// * `samples_dir` - Directory receiving `samples_epoch_{epoch}.png` grids
    ///
    /// # Returns
    ///
    /// Training metrics. Any failure aborts the whole run.
    pub fn train(
        &mut self,
        model: &mut Wgan,
        data_loader: &mut DataLoader,
        samples_dir: &Path,
    ) -> Result<&TrainingMetrics> {
        self.config.validate()?;
        if data_loader.num_samples() == 0 {
            return Err(StegoGanError::InvalidConfig(
                "data loader holds no samples".to_string(),
            ));
        }

        let mut critic_opt = model.critic_optimizer(self.config.lr)?;
        let mut gen_opt = model.gen_optimizer(self.config.lr)?;
        let num_batches = data_loader.num_batches();

        info!(
            "Starting training for {} epochs, {} batches per epoch",
            self.config.epochs, num_batches
        );

        for epoch in 0..self.config.epochs {
            let pb = progress_bar(num_batches as u64);
            let mut smoothed = EMATracker::new(0.3);

            let mut last_critic = None;
            let mut last_gen = None;
            let mut penalty_sum = 0.0;
            let mut wasserstein_sum = 0.0;
            let mut batch_count = 0usize;

            for (i, batch) in data_loader.iter().enumerate() {
                let real = Tensor::try_from(batch)?
                    .to_kind(Kind::Float)
                    .to_device(self.device);

                let step = self.critic_step(model, &mut critic_opt, &real)?;
                penalty_sum += step.penalty;
                wasserstein_sum += step.wasserstein;
                smoothed.update(step.loss);
                last_critic = Some(step.loss);

                if i % self.config.n_critic == 0 {
                    let batch_size = real.size()[0];
                    last_gen = Some(self.generator_step(model, &mut gen_opt, batch_size)?);
                }

                batch_count += 1;
                pb.set_message(format!(
                    "C: {:.4}, G: {:.4}",
                    smoothed.value(),
                    last_gen.unwrap_or(0.0)
                ));
                pb.inc(1);
            }

            pb.finish_and_clear();

            let critic_loss = last_critic.unwrap_or(0.0);
            let gen_loss = last_gen.unwrap_or(0.0);
            let n = batch_count.max(1) as f64;
            self.metrics
                .record_epoch(critic_loss, gen_loss, penalty_sum / n, wasserstein_sum / n);

            info!(
                "Epoch {}/{}: C_loss={:.4}, G_loss={:.4}, GP={:.4}, W_dist={:.4}",
                epoch,
                self.config.epochs,
                critic_loss,
                gen_loss,
                penalty_sum / n,
                wasserstein_sum / n
            );

            if self.metrics.check_lipschitz_drift(10) {
                warn!("Gradient penalty stays above 1; consider a lower learning rate");
            }

            if epoch % self.config.sample_every == 0 {
                let path = self.save_samples(model, samples_dir, epoch)?;
                info!("Saved generated samples to {}", path.display());
                self.sample_paths.push(path);
            }
        }

        Ok(&self.metrics)
    }

    /// One critic update on a real batch
    ///
    /// Fakes are generated without a generator graph, so this step only
    /// moves the critic's parameters.
    pub fn critic_step(
        &mut self,
        model: &Wgan,
        critic_opt: &mut nn::Optimizer,
        real: &Tensor,
    ) -> Result<CriticStep> {
        let batch_size = real.size()[0];
        let noise = model.generator.sample_noise(batch_size, self.device);
        let fake = tch::no_grad(|| model.generator.forward_t(&noise, true));

        let real_scores = model.critic.score(real);
        let fake_scores = model.critic.score(&fake);
        let critic = &model.critic;
        let penalty = gradient_penalty(|x| critic.score(x), real, &fake);

        let loss = critic_loss(&real_scores, &fake_scores) + &penalty * self.config.lambda_gp;

        critic_opt.zero_grad();
        loss.backward();
        critic_opt.step();
        self.critic_steps += 1;

        let step = CriticStep {
            loss: finite(&loss, "critic loss")?,
            penalty: finite(&penalty, "gradient penalty")?,
            wasserstein: real_scores.mean(Kind::Float).double_value(&[])
                - fake_scores.mean(Kind::Float).double_value(&[]),
        };
        debug!(
            "critic step {}: loss={:.4} gp={:.4}",
            self.critic_steps, step.loss, step.penalty
        );
        Ok(step)
    }

    /// One generator update on a fresh fake batch
    pub fn generator_step(
        &mut self,
        model: &Wgan,
        gen_opt: &mut nn::Optimizer,
        batch_size: i64,
    ) -> Result<f64> {
        let noise = model.generator.sample_noise(batch_size, self.device);
        let fake = model.generator.forward_t(&noise, true);
        let loss = generator_loss(&model.critic.score(&fake));

        gen_opt.zero_grad();
        loss.backward();
        gen_opt.step();
        self.generator_steps += 1;

        finite(&loss, "generator loss")
    }

    fn save_samples(&self, model: &Wgan, samples_dir: &Path, epoch: usize) -> Result<PathBuf> {
        let samples = model.generate(self.config.sample_count);
        let grid = make_grid(&samples, 4, 2)?;
        let path = samples_dir.join(format!("samples_epoch_{}.png", epoch));
        grid.save(&path)?;
        Ok(path)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Sample grids written so far
    pub fn sample_paths(&self) -> &[PathBuf] {
        &self.sample_paths
    }

    /// Number of (critic, generator) optimizer steps taken
    pub fn step_counts(&self) -> (usize, usize) {
        (self.critic_steps, self.generator_steps)
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

fn finite(t: &Tensor, what: &str) -> Result<f64> {
    let value = t.double_value(&[]);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StegoGanError::Training(format!("{} is {}", what, value)))
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

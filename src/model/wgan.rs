//! WGAN wrapper combining Generator and Critic
//!
//! Owns one variable store per network so checkpoints and optimizers
//! stay separate.

use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use super::critic::{Critic, CriticConfig};
use super::generator::{Generator, GeneratorConfig};
use crate::error::Result;

/// Adam betas used for both networks
pub const ADAM_BETAS: (f64, f64) = (0.5, 0.9);

/// Complete WGAN-GP model
pub struct Wgan {
    /// Generator network
    pub generator: Generator,
    /// Critic network
    pub critic: Critic,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for critic
    pub critic_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Wgan {
    /// Create a new WGAN model
    ///
    /// # Arguments
    ///
    /// * `gen_config` - Generator configuration
    /// * `critic_config` - Critic configuration
    /// * `device` - Device to create model on
    pub fn new(gen_config: GeneratorConfig, critic_config: CriticConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let critic_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let critic = Critic::new(&critic_vs.root(), critic_config);

        Self {
            generator,
            critic,
            gen_vs,
            critic_vs,
            device,
        }
    }

    /// Create a WGAN with 64 feature maps on both sides for the given latent size
    pub fn with_defaults(latent_dim: i64, device: Device) -> Self {
        let gen_config = GeneratorConfig {
            latent_dim,
            ..Default::default()
        };
        Self::new(gen_config, CriticConfig::default(), device)
    }

    /// Generate images from fresh noise in inference mode
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, 3, 64, 64)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        let noise = self.generator.sample_noise(num_samples, self.device);
        tch::no_grad(|| self.generator.forward_t(&noise, false))
    }

    /// Score images with the critic
    pub fn score(&self, images: &Tensor) -> Tensor {
        self.critic.score(images)
    }

    /// Get generator optimizer
    pub fn gen_optimizer(&self, lr: f64) -> Result<nn::Optimizer> {
        Ok(adam().build(&self.gen_vs, lr)?)
    }

    /// Get critic optimizer
    pub fn critic_optimizer(&self, lr: f64) -> Result<nn::Optimizer> {
        Ok(adam().build(&self.critic_vs, lr)?)
    }

    /// Save both networks
    pub fn save(&self, gen_path: impl AsRef<Path>, critic_path: impl AsRef<Path>) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.critic_vs.save(critic_path)?;
        Ok(())
    }

    /// Load generator weights only
    pub fn load_generator(&mut self, gen_path: impl AsRef<Path>) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        Ok(())
    }

    /// Load both networks
    pub fn load(&mut self, gen_path: impl AsRef<Path>, critic_path: impl AsRef<Path>) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        self.critic_vs.load(critic_path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }
}

fn adam() -> nn::Adam {
    nn::Adam {
        beta1: ADAM_BETAS.0,
        beta2: ADAM_BETAS.1,
        ..Default::default()
    }
}

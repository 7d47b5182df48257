//! Model module containing WGAN-GP architecture components
//!
//! This module provides:
//! - Generator network mapping latent noise to images
//! - Critic network scoring images with an unbounded value
//! - Layer-kind weight initialization
//! - WGAN wrapper combining both networks

pub mod init;
mod generator;
mod critic;
mod wgan;

pub use critic::{leaky_relu, Critic, CriticConfig, LEAKY_SLOPE};
pub use generator::{Generator, GeneratorConfig, IMAGE_SIZE};
pub use init::LayerKind;
pub use wgan::{Wgan, ADAM_BETAS};

//! Training module for WGAN-GP
//!
//! This module provides:
//! - Training loop implementation
//! - Loss functions (Wasserstein + gradient penalty)
//! - Training configuration and metrics

mod trainer;
mod losses;
mod metrics;

pub use trainer::{CriticStep, Trainer, TrainingConfig};
pub use losses::{critic_loss, generator_loss, gradient_penalty};
pub use metrics::{EMATracker, TrainingMetrics};

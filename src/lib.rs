//! # WGAN-GP image generation with steganographic proofs
//!
//! This crate trains a DCGAN generator against a Wasserstein critic with
//! gradient penalty, one model per (username, model_name) tenant, and uses
//! the trained generator to produce images carrying a hidden payload
//! (typically a block hash) via least-significant-bit steganography.
//!
//! ## Modules
//!
//! - `data`: Image loading, normalization and batching
//! - `model`: Generator, Critic and the `Wgan` pair
//! - `training`: WGAN-GP losses, training loop and metrics
//! - `stego`: LSB embed/extract
//! - `proof`: SHA-256 proof hash of a generated image
//! - `tenant`: Per-tenant directory layout
//! - `pipeline`: Train, Generate+Embed and Extract operations
//! - `utils`: Configuration and checkpoints

pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod proof;
pub mod stego;
pub mod tenant;
pub mod training;
pub mod utils;

pub use data::{DataLoader, ImageDataset};
pub use error::{ErrorKind, Result, StegoGanError};
pub use model::{Critic, Generator, Wgan};
pub use pipeline::{
    ExtractMode, Extraction, Studio, TrainOutcome, TrainRequest, UploadedImage, PAYLOAD_HEADER,
};
pub use tenant::{Tenant, TenantLayout};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{load_checkpoint, save_checkpoint, Config};

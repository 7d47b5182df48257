//! Checkpoint save/load utilities
//!
//! A tenant checkpoint is the generator and critic weights plus a
//! `meta.json` describing them. Weights are first written under a
//! `.partial` name and moved into place only once both saves succeeded;
//! `meta.json` goes last, so a directory without it never holds a
//! loadable pair.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StegoGanError};
use crate::model::Wgan;
use crate::training::TrainingMetrics;

/// Generator weights file name
pub const GENERATOR_FILE: &str = "generator.pt";
/// Critic weights file name
pub const CRITIC_FILE: &str = "critic.pt";
/// Metadata file name
pub const META_FILE: &str = "meta.json";

/// Checkpoint metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Latent size the generator was built with
    pub latent_dim: i64,
    /// Number of epochs trained
    pub epochs: usize,
    /// Critic loss at the end of training
    pub critic_loss: f64,
    /// Generator loss at the end of training
    pub gen_loss: f64,
    /// Proof hash emitted for this run
    pub proof: String,
    /// Timestamp of checkpoint
    pub timestamp: String,
}

impl CheckpointMeta {
    /// Describe a finished run
    pub fn new(model: &Wgan, metrics: &TrainingMetrics, proof: impl Into<String>) -> Self {
        Self {
            latent_dim: model.latent_dim(),
            epochs: metrics.num_epochs(),
            critic_loss: metrics.latest_critic_loss().unwrap_or(0.0),
            gen_loss: metrics.latest_gen_loss().unwrap_or(0.0),
            proof: proof.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Paths of a saved checkpoint pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    pub generator: PathBuf,
    pub critic: PathBuf,
    pub meta: PathBuf,
}

impl CheckpointPaths {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            generator: dir.join(GENERATOR_FILE),
            critic: dir.join(CRITIC_FILE),
            meta: dir.join(META_FILE),
        }
    }
}

/// Save a complete checkpoint (both networks + metadata)
///
/// # Arguments
///
/// * `model` - WGAN model to save
/// * `dir` - Directory to save checkpoint into
/// * `meta` - Metadata written after both weight files are in place
///
/// # Returns
///
/// Paths of the written files
pub fn save_checkpoint(
    model: &Wgan,
    dir: impl AsRef<Path>,
    meta: &CheckpointMeta,
) -> Result<CheckpointPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let paths = CheckpointPaths::in_dir(dir);

    let gen_partial = partial(&paths.generator);
    let critic_partial = partial(&paths.critic);
    if let Err(e) = model.save(&gen_partial, &critic_partial) {
        let _ = std::fs::remove_file(&gen_partial);
        let _ = std::fs::remove_file(&critic_partial);
        return Err(e);
    }

    // Stale metadata must not describe the new weights
    if paths.meta.exists() {
        std::fs::remove_file(&paths.meta)?;
    }
    std::fs::rename(&gen_partial, &paths.generator)?;
    std::fs::rename(&critic_partial, &paths.critic)?;

    let meta_partial = partial(&paths.meta);
    std::fs::write(&meta_partial, serde_json::to_string_pretty(meta)?)?;
    std::fs::rename(&meta_partial, &paths.meta)?;

    tracing::info!("Saved checkpoint to {}", dir.display());
    Ok(paths)
}

/// Load checkpoint metadata
///
/// A directory without `meta.json` or without generator weights is
/// reported as `CheckpointNotFound`.
pub fn load_checkpoint_meta(dir: impl AsRef<Path>) -> Result<CheckpointMeta> {
    let paths = CheckpointPaths::in_dir(dir);
    for required in [&paths.meta, &paths.generator] {
        if !required.is_file() {
            return Err(StegoGanError::CheckpointNotFound(required.clone()));
        }
    }
    let content = std::fs::read_to_string(&paths.meta)?;
    Ok(serde_json::from_str(&content)?)
}

/// Rebuild a model from a saved checkpoint
///
/// The critic is restored too when its weights are present.
pub fn load_checkpoint(
    dir: impl AsRef<Path>,
    device: tch::Device,
) -> Result<(Wgan, CheckpointMeta)> {
    let dir = dir.as_ref();
    let meta = load_checkpoint_meta(dir)?;
    let paths = CheckpointPaths::in_dir(dir);

    let mut model = Wgan::with_defaults(meta.latent_dim, device);
    if paths.critic.is_file() {
        model.load(&paths.generator, &paths.critic)?;
    } else {
        model.load_generator(&paths.generator)?;
    }

    tracing::info!(
        "Loaded checkpoint from {} ({} epochs, latent_dim {})",
        dir.display(),
        meta.epochs,
        meta.latent_dim
    );
    Ok((model, meta))
}

fn partial(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

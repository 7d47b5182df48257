//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities

mod checkpoint;
mod config;

pub use checkpoint::{
    load_checkpoint, load_checkpoint_meta, save_checkpoint, CheckpointMeta, CheckpointPaths,
    CRITIC_FILE, GENERATOR_FILE, META_FILE,
};
pub use config::{ensure_config_exists, Config, StorageConfig};

//! Per-tenant storage namespace
//!
//! Every (username, model_name) pair owns three directories under the
//! configured base directory:
//!
//! ```text
//! <base>/<username>/<model_name>/uploaded_images
//! <base>/<username>/<model_name>/generated_samples
//! <base>/<username>/<model_name>/saved_models
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StegoGanError};

/// Raw uploads of the last training run
pub const UPLOADS_DIR: &str = "uploaded_images";
/// Periodic sample grids and the metrics CSV
pub const SAMPLES_DIR: &str = "generated_samples";
/// Checkpoint pair and its metadata
pub const MODELS_DIR: &str = "saved_models";

/// Validated tenant identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant {
    username: String,
    model_name: String,
}

impl Tenant {
    /// Build a tenant from raw request fields
    ///
    /// Both fields must be non-empty and usable as a single path component.
    pub fn new(username: impl Into<String>, model_name: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let model_name = model_name.into();
        check_component("username", &username)?;
        check_component("model_name", &model_name)?;
        Ok(Self {
            username,
            model_name,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Directories of this tenant under `base_dir`
    pub fn layout(&self, base_dir: impl AsRef<Path>) -> TenantLayout {
        TenantLayout::new(
            base_dir
                .as_ref()
                .join(&self.username)
                .join(&self.model_name),
        )
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.username, self.model_name)
    }
}

fn check_component(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StegoGanError::MissingIdentity(field));
    }
    if value.starts_with('.') || value.contains(['/', '\\', '\0']) {
        return Err(StegoGanError::InvalidIdentity(format!(
            "{} {:?} is not a valid directory name",
            field, value
        )));
    }
    Ok(())
}

/// The three working directories of one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantLayout {
    root: PathBuf,
}

impl TenantLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn samples(&self) -> PathBuf {
        self.root.join(SAMPLES_DIR)
    }

    pub fn models(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    /// Path inside the upload directory for a client file name
    ///
    /// The name is sanitized first. When that name is taken, the upload
    /// index is prepended, then bumped until the name is free.
    pub fn free_upload_path(&self, filename: &str, index: usize) -> PathBuf {
        let uploads = self.uploads();
        let name = sanitize_filename(filename, index);
        let mut path = uploads.join(&name);
        let mut prefix = index;
        while path.exists() {
            path = uploads.join(format!("{}_{}", prefix, name));
            prefix += 1;
        }
        path
    }

    /// Wipe and recreate all three directories
    pub fn reset(&self) -> Result<()> {
        for dir in [self.uploads(), self.samples(), self.models()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;
            debug!("Reset {}", dir.display());
        }
        Ok(())
    }
}

/// Reduce an uploaded filename to a safe single path component
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; other characters become `_`.
/// Directory parts are dropped and leading dots stripped. A name with
/// nothing left becomes `image_<index>`.
pub fn sanitize_filename(name: &str, index: usize) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.chars().all(|c| c == '_') {
        format!("image_{}", index)
    } else {
        cleaned.to_string()
    }
}

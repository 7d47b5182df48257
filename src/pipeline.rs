//! Boundary operations of the service
//!
//! [`Studio`] ties the pieces together per tenant namespace:
//! - Train: uploads -> dataset -> WGAN-GP training -> checkpoint pair + proof
//! - Generate+Embed: checkpoint -> one generated image -> payload embedded -> PNG bytes
//! - Extract: image bytes -> payload
//!
//! Request and response marshalling belongs to the HTTP layer in front of it.

use std::path::PathBuf;

use tch::Device;
use tracing::{info, warn};

use crate::data::pixels::{decode_rgb, encode_png, tensor_to_image};
use crate::data::{DataLoader, ImageDataset};
use crate::error::{Result, StegoGanError};
use crate::model::Wgan;
use crate::proof::proof;
use crate::stego;
use crate::tenant::Tenant;
use crate::training::{Trainer, TrainingConfig, TrainingMetrics};
use crate::utils::{load_checkpoint, save_checkpoint, CheckpointMeta, Config};

/// Response header carrying the payload when an extraction also returns the image
pub const PAYLOAD_HEADER: &str = "X-Block-Hash";

/// File name of the per-run metrics export inside the samples directory
pub const METRICS_FILE: &str = "training_metrics.csv";

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-supplied name, sanitized before it touches the filesystem
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Input of a training run
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub tenant: Tenant,
    pub images: Vec<UploadedImage>,
    pub training: TrainingConfig,
}

/// Result of a finished training run
#[derive(Debug)]
pub struct TrainOutcome {
    pub generator_path: PathBuf,
    pub critic_path: PathBuf,
    /// Proof hash of one image sampled from the final generator
    pub proof: String,
    pub epochs: usize,
    pub metrics: TrainingMetrics,
}

/// How an extraction reports its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Payload only
    #[default]
    PayloadOnly,
    /// Payload plus the unchanged image bytes, for a response that carries
    /// the payload in [`PAYLOAD_HEADER`]
    WithImage,
}

/// Result of an extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub payload: String,
    pub image: Option<Vec<u8>>,
}

/// Per-tenant training and embedding service
pub struct Studio {
    config: Config,
    device: Device,
}

impl Studio {
    /// Create a studio, resolving the compute device once
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let device = config.device();
        Ok(Self { config, device })
    }

    /// Create a studio on an explicit device
    pub fn with_device(config: Config, device: Device) -> Self {
        Self { config, device }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Train a fresh WGAN-GP for a tenant
    ///
    /// The request is validated before the tenant namespace is touched.
    /// Previous uploads, samples and checkpoints of the tenant are wiped
    /// before the new run starts. Any failure aborts the run without a
    /// loadable checkpoint.
    pub fn train(&self, request: TrainRequest) -> Result<TrainOutcome> {
        let TrainRequest {
            tenant,
            images,
            training,
        } = request;

        if images.is_empty() {
            return Err(StegoGanError::NoImages);
        }
        training.validate()?;

        let layout = tenant.layout(&self.config.storage.base_dir);
        layout.reset()?;

        let uploads = layout.uploads();
        for (i, upload) in images.iter().enumerate() {
            std::fs::write(layout.free_upload_path(&upload.filename, i), &upload.bytes)?;
        }
        info!("Stored {} uploads for {}", images.len(), tenant);

        let dataset = ImageDataset::from_dir(&uploads, training.image_size)?;
        if dataset.len() < images.len() {
            warn!(
                "{} of {} uploads could not be decoded",
                images.len() - dataset.len(),
                images.len()
            );
        }

        let mut loader = DataLoader::new(dataset.into_array(), training.batch_size, true, false);
        let mut model = Wgan::with_defaults(training.latent_dim, self.device);
        let mut trainer = Trainer::new(training, self.device);

        let samples = layout.samples();
        let metrics = trainer.train(&mut model, &mut loader, &samples)?.clone();
        metrics.save_csv(samples.join(METRICS_FILE))?;

        let proof = proof(&model.generator, self.device)?;
        let meta = CheckpointMeta::new(&model, &metrics, proof.clone());
        let paths = save_checkpoint(&model, layout.models(), &meta)?;

        info!("Training for {} complete, proof {}", tenant, proof);
        Ok(TrainOutcome {
            generator_path: paths.generator,
            critic_path: paths.critic,
            proof,
            epochs: metrics.num_epochs(),
            metrics,
        })
    }

    /// Generate one image with the tenant's generator and hide `payload` in it
    ///
    /// Returns PNG bytes, which preserve the embedded bits.
    pub fn generate_embedded(&self, tenant: &Tenant, payload: &str) -> Result<Vec<u8>> {
        let side = crate::model::IMAGE_SIZE as u32;
        let capacity_bits = (3 * side * side) as usize;
        let required_bits = stego::frame::frame_bits(payload.len());
        if required_bits > capacity_bits {
            return Err(StegoGanError::CapacityExceeded {
                required_bits,
                capacity_bits,
            });
        }

        let layout = tenant.layout(&self.config.storage.base_dir);
        let (model, _) = load_checkpoint(layout.models(), self.device)?;

        let image = tensor_to_image(&model.generate(1))?;
        let stego = stego::embed(&image, payload)?;
        info!("Embedded {} byte payload for {}", payload.len(), tenant);
        encode_png(&stego)
    }

    /// Recover the payload hidden in an uploaded image
    pub fn extract(&self, bytes: &[u8], mode: ExtractMode) -> Result<Extraction> {
        let image = decode_rgb(bytes)?;
        let payload = stego::extract(&image)?;
        let image = match mode {
            ExtractMode::PayloadOnly => None,
            ExtractMode::WithImage => Some(bytes.to_vec()),
        };
        Ok(Extraction { payload, image })
    }

    /// Fresh proof hash from the tenant's stored generator
    pub fn proof(&self, tenant: &Tenant) -> Result<String> {
        let layout = tenant.layout(&self.config.storage.base_dir);
        let (model, _) = load_checkpoint(layout.models(), self.device)?;
        proof(&model.generator, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn studio(base: &std::path::Path) -> Studio {
        let mut config = Config::default();
        config.storage.base_dir = base.to_path_buf();
        Studio::with_device(config, Device::Cpu)
    }

    #[test]
    fn test_train_rejects_empty_upload_set() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());
        let request = TrainRequest {
            tenant: Tenant::new("alice", "cats").unwrap(),
            images: vec![],
            training: TrainingConfig::default(),
        };

        assert!(matches!(studio.train(request), Err(StegoGanError::NoImages)));
        // Nothing was created for the tenant
        assert!(!dir.path().join("alice").exists());
    }

    #[test]
    fn test_colliding_upload_names_are_all_kept() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());
        let tenant = Tenant::new("alice", "dupes").unwrap();
        let request = TrainRequest {
            tenant: tenant.clone(),
            images: vec![
                UploadedImage::new("a.png", b"first".to_vec()),
                UploadedImage::new("2_a.png", b"second".to_vec()),
                UploadedImage::new("a.png", b"third".to_vec()),
            ],
            training: TrainingConfig::default(),
        };

        // None of the uploads decode, so the run stops after storing them
        assert!(matches!(
            studio.train(request),
            Err(StegoGanError::EmptyDataset(_))
        ));

        let uploads = tenant.layout(dir.path()).uploads();
        let mut contents: Vec<Vec<u8>> = std::fs::read_dir(&uploads)
            .unwrap()
            .map(|e| std::fs::read(e.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        assert_eq!(
            contents,
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );
    }

    #[test]
    fn test_train_rejects_bad_config_before_wipe() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());
        let tenant = Tenant::new("alice", "cats").unwrap();
        let layout = tenant.layout(dir.path());
        layout.reset().unwrap();
        std::fs::write(layout.models().join("keep"), b"x").unwrap();

        let request = TrainRequest {
            tenant,
            images: vec![UploadedImage::new("a.png", vec![1, 2, 3])],
            training: TrainingConfig {
                batch_size: 0,
                ..Default::default()
            },
        };
        assert!(matches!(
            studio.train(request),
            Err(StegoGanError::InvalidConfig(_))
        ));
        assert!(layout.models().join("keep").exists());
    }

    #[test]
    fn test_generate_without_checkpoint() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());
        let tenant = Tenant::new("nobody", "none").unwrap();

        let err = studio.generate_embedded(&tenant, "hash").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_generate_rejects_oversized_payload() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());
        let tenant = Tenant::new("nobody", "none").unwrap();

        // 64x64x3 = 12288 bits hold at most 1524 payload bytes
        let err = studio
            .generate_embedded(&tenant, &"x".repeat(1525))
            .unwrap_err();
        assert!(matches!(err, StegoGanError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_extract_modes() {
        let dir = tempdir().unwrap();
        let studio = studio(dir.path());

        let carrier = image::RgbImage::from_pixel(16, 16, image::Rgb([120, 64, 200]));
        let png = encode_png(&stego::embed(&carrier, "block-42").unwrap()).unwrap();

        let plain = studio.extract(&png, ExtractMode::PayloadOnly).unwrap();
        assert_eq!(plain.payload, "block-42");
        assert!(plain.image.is_none());

        let with_image = studio.extract(&png, ExtractMode::WithImage).unwrap();
        assert_eq!(with_image.payload, "block-42");
        assert_eq!(with_image.image.as_deref(), Some(png.as_slice()));

        let clean = encode_png(&carrier).unwrap();
        assert!(matches!(
            studio.extract(&clean, ExtractMode::PayloadOnly),
            Err(StegoGanError::NoEmbeddedPayload)
        ));
    }
}

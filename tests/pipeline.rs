//! End-to-end tests of the tenant pipeline

use std::path::Path;

use image::{Rgb, RgbImage};
use tch::Device;
use tempfile::tempdir;

use rust_wgan_stego::{
    data::pixels::encode_png,
    proof::is_proof,
    tenant::Tenant,
    utils::{load_checkpoint_meta, Config},
    ErrorKind, ExtractMode, StegoGanError, Studio, TrainRequest, TrainingConfig, UploadedImage,
};

fn studio(base: &Path) -> Studio {
    let mut config = Config::default();
    config.storage.base_dir = base.to_path_buf();
    Studio::with_device(config, Device::Cpu)
}

fn synthetic_png(seed: u8, width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_mul(4).wrapping_add(seed),
            (y as u8).wrapping_mul(4),
            seed.wrapping_mul(37),
        ])
    });
    encode_png(&img).unwrap()
}

fn uploads(count: usize) -> Vec<UploadedImage> {
    (0..count)
        .map(|i| {
            let png = synthetic_png(i as u8, 48 + i as u32, 64);
            UploadedImage::new(format!("img_{}.png", i), png)
        })
        .collect()
}

fn small_run() -> TrainingConfig {
    TrainingConfig {
        epochs: 2,
        batch_size: 2,
        n_critic: 2,
        ..Default::default()
    }
}

fn sample_grids(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("samples_epoch_") && n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_train_end_to_end() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("alice", "cats").unwrap();

    let outcome = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: uploads(4),
            training: small_run(),
        })
        .unwrap();

    assert!(outcome.generator_path.is_file());
    assert!(outcome.critic_path.is_file());
    assert_eq!(outcome.epochs, 2);
    assert!(is_proof(&outcome.proof), "{}", outcome.proof);

    let layout = tenant.layout(dir.path());
    assert_eq!(sample_grids(&layout.samples()), vec!["samples_epoch_0.png"]);
    assert!(layout.samples().join("training_metrics.csv").is_file());
    assert_eq!(std::fs::read_dir(layout.uploads()).unwrap().count(), 4);

    let meta = load_checkpoint_meta(layout.models()).unwrap();
    assert_eq!(meta.latent_dim, 100);
    assert_eq!(meta.epochs, 2);
    assert_eq!(meta.proof, outcome.proof);
}

#[test]
fn test_retraining_overwrites_namespace() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("bob", "faces").unwrap();
    let layout = tenant.layout(dir.path());

    let first = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: uploads(4),
            training: TrainingConfig {
                epochs: 1,
                ..small_run()
            },
        })
        .unwrap();

    let second_uploads: Vec<UploadedImage> = (0..2)
        .map(|i: u8| {
            UploadedImage::new(format!("second_{}.png", i), synthetic_png(100 + i, 64, 64))
        })
        .collect();
    let second = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: second_uploads,
            training: TrainingConfig {
                epochs: 1,
                latent_dim: 32,
                ..small_run()
            },
        })
        .unwrap();

    assert_eq!(first.generator_path, second.generator_path);

    let mut upload_names: Vec<String> = std::fs::read_dir(layout.uploads())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    upload_names.sort();
    assert_eq!(upload_names, vec!["second_0.png", "second_1.png"]);

    let mut model_files: Vec<String> = std::fs::read_dir(layout.models())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    model_files.sort();
    assert_eq!(model_files, vec!["critic.pt", "generator.pt", "meta.json"]);

    let meta = load_checkpoint_meta(layout.models()).unwrap();
    assert_eq!(meta.latent_dim, 32);
    assert_eq!(meta.proof, second.proof);
}

#[test]
fn test_undecodable_uploads_are_rejected() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("carol", "notes").unwrap();

    let err = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: vec![
                UploadedImage::new("readme.txt", b"not an image".to_vec()),
                UploadedImage::new("data.csv", b"a,b\n1,2\n".to_vec()),
            ],
            training: small_run(),
        })
        .unwrap_err();

    assert!(matches!(err, StegoGanError::EmptyDataset(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    // No optimizer step ran, so no sample grid or checkpoint exists
    let layout = tenant.layout(dir.path());
    assert!(sample_grids(&layout.samples()).is_empty());
    assert!(load_checkpoint_meta(layout.models()).is_err());
}

#[test]
fn test_mixed_uploads_skip_bad_files() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());

    let mut images = uploads(2);
    images.push(UploadedImage::new("broken.png", vec![0x89, b'P', b'N', b'G']));

    let outcome = studio
        .train(TrainRequest {
            tenant: Tenant::new("dave", "mixed").unwrap(),
            images,
            training: TrainingConfig {
                epochs: 1,
                ..small_run()
            },
        })
        .unwrap();
    assert!(is_proof(&outcome.proof));
}

#[test]
fn test_failed_run_leaves_no_checkpoint() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("gina", "diverging").unwrap();
    let layout = tenant.layout(dir.path());

    studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: uploads(2),
            training: TrainingConfig {
                epochs: 1,
                ..small_run()
            },
        })
        .unwrap();
    assert!(load_checkpoint_meta(layout.models()).is_ok());

    // One Adam step of this size pushes critic weights past f32 range
    let err = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: uploads(2),
            training: TrainingConfig {
                epochs: 1,
                lr: 1e30,
                ..small_run()
            },
        })
        .unwrap_err();
    assert!(matches!(err, StegoGanError::Training(_)), "{}", err);
    assert_eq!(err.kind(), ErrorKind::Runtime);

    // The earlier checkpoint was wiped and nothing replaced it
    assert!(matches!(
        load_checkpoint_meta(layout.models()),
        Err(StegoGanError::CheckpointNotFound(_))
    ));
    assert!(!layout.models().join("generator.pt").exists());
    assert!(sample_grids(&layout.samples()).is_empty());
    assert!(matches!(
        studio.generate_embedded(&tenant, "hash"),
        Err(StegoGanError::CheckpointNotFound(_))
    ));
}

#[test]
fn test_missing_identity_and_images() {
    assert!(matches!(
        Tenant::new("", "cats"),
        Err(StegoGanError::MissingIdentity("username"))
    ));
    assert!(matches!(
        Tenant::new("alice", ""),
        Err(StegoGanError::MissingIdentity("model_name"))
    ));

    let dir = tempdir().unwrap();
    let err = studio(dir.path())
        .train(TrainRequest {
            tenant: Tenant::new("alice", "cats").unwrap(),
            images: Vec::new(),
            training: small_run(),
        })
        .unwrap_err();
    assert!(matches!(err, StegoGanError::NoImages));
    assert!(err.is_validation());
}

#[test]
fn test_generate_requires_checkpoint() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("erin", "untrained").unwrap();

    let err = studio.generate_embedded(&tenant, "hash").unwrap_err();
    assert!(matches!(err, StegoGanError::CheckpointNotFound(_)));
    assert!(studio.proof(&tenant).is_err());
}

#[test]
fn test_train_generate_extract_round_trip() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());
    let tenant = Tenant::new("frank", "blocks").unwrap();

    let outcome = studio
        .train(TrainRequest {
            tenant: tenant.clone(),
            images: uploads(4),
            training: TrainingConfig {
                epochs: 1,
                ..small_run()
            },
        })
        .unwrap();

    let block_hash = "0000000000000000000a3f5c8e1b2d4f6a7c9e0b1d3f5a7c9e1b3d5f7a9c1e3d";
    let png = studio.generate_embedded(&tenant, block_hash).unwrap();

    // Survives a write to disk and a read back
    let path = dir.path().join("embedded.png");
    std::fs::write(&path, &png).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    let extraction = studio.extract(&bytes, ExtractMode::PayloadOnly).unwrap();
    assert_eq!(extraction.payload, block_hash);

    let with_image = studio.extract(&bytes, ExtractMode::WithImage).unwrap();
    assert_eq!(with_image.payload, block_hash);
    assert_eq!(with_image.image, Some(bytes));

    // The training proof round-trips too
    let png = studio.generate_embedded(&tenant, &outcome.proof).unwrap();
    let extraction = studio.extract(&png, ExtractMode::PayloadOnly).unwrap();
    assert_eq!(extraction.payload, outcome.proof);

    let fresh = studio.proof(&tenant).unwrap();
    assert!(is_proof(&fresh));
}

#[test]
fn test_extract_plain_image_fails() {
    let dir = tempdir().unwrap();
    let studio = studio(dir.path());

    let plain = encode_png(&RgbImage::from_pixel(64, 64, Rgb([10, 20, 30]))).unwrap();
    let err = studio.extract(&plain, ExtractMode::PayloadOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = studio
        .extract(b"definitely not an image", ExtractMode::PayloadOnly)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

//! Standalone binary for training a WGAN-GP model outside any tenant namespace
//!
//! Usage:
//!   cargo run --bin train_model -- --images data/cats --epochs 100

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_wgan_stego::{
    data::{DataLoader, ImageDataset},
    model::Wgan,
    proof::proof,
    training::{Trainer, TrainingConfig},
    utils::{save_checkpoint, CheckpointMeta},
};

/// Train a WGAN-GP image generator
#[derive(Parser)]
#[command(name = "train_model")]
#[command(about = "Train a WGAN-GP generator on a directory of images")]
struct Args {
    /// Directory holding the training images
    #[arg(short, long)]
    images: PathBuf,

    /// Number of training epochs
    #[arg(short, long, default_value = "100")]
    epochs: usize,

    /// Batch size
    #[arg(short, long, default_value = "64")]
    batch_size: usize,

    /// Latent dimension size
    #[arg(long, default_value = "100")]
    latent_dim: i64,

    /// Learning rate for both networks
    #[arg(long, default_value = "0.0001")]
    lr: f64,

    /// Critic steps per generator step
    #[arg(long, default_value = "5")]
    n_critic: usize,

    /// Gradient penalty weight
    #[arg(long, default_value = "10.0")]
    lambda_gp: f64,

    /// Checkpoint directory
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// Sample grid directory
    #[arg(long, default_value = "samples")]
    samples_dir: PathBuf,

    /// Use GPU if available
    #[arg(long)]
    gpu: bool,
}

fn main() -> Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    // Determine device
    let device = if args.gpu && tch::Cuda::is_available() {
        info!("Using CUDA GPU");
        tch::Device::Cuda(0)
    } else {
        info!("Using CPU");
        tch::Device::Cpu
    };

    let training_config = TrainingConfig {
        epochs: args.epochs,
        latent_dim: args.latent_dim,
        batch_size: args.batch_size,
        lr: args.lr,
        n_critic: args.n_critic,
        lambda_gp: args.lambda_gp,
        ..Default::default()
    };
    training_config.validate()?;

    // Load data
    info!("Loading images from {}", args.images.display());
    let dataset = ImageDataset::from_dir(&args.images, training_config.image_size)?;
    info!("Loaded {} images", dataset.len());

    let mut data_loader =
        DataLoader::new(dataset.into_array(), training_config.batch_size, true, false);
    info!(
        "DataLoader: {} batches of size {}",
        data_loader.num_batches(),
        training_config.batch_size
    );

    let mut model = Wgan::with_defaults(training_config.latent_dim, device);
    info!("Created WGAN: latent_dim={}", model.latent_dim());

    std::fs::create_dir_all(&args.samples_dir)?;
    let mut trainer = Trainer::new(training_config, device);

    info!("Starting training for {} epochs", args.epochs);
    info!("  LR: {}, n_critic: {}, lambda_gp: {}", args.lr, args.n_critic, args.lambda_gp);
    let metrics = trainer
        .train(&mut model, &mut data_loader, &args.samples_dir)?
        .clone();
    metrics.save_csv(args.samples_dir.join("training_metrics.csv"))?;

    let proof = proof(&model.generator, device)?;
    let meta = CheckpointMeta::new(&model, &metrics, proof.clone());
    let paths = save_checkpoint(&model, &args.checkpoint_dir, &meta)?;

    info!("Training complete!");
    info!(
        "Final metrics: C_loss={:.4}, G_loss={:.4}",
        metrics.latest_critic_loss().unwrap_or(0.0),
        metrics.latest_gen_loss().unwrap_or(0.0)
    );
    info!("Generator saved to {}", paths.generator.display());
    info!("Proof: {}", proof);

    Ok(())
}

//! Standalone binary for embedding a payload into a freshly generated image
//!
//! Usage:
//!   cargo run --bin embed_proof -- --model checkpoints --payload 00000000a3f5 --output proof.png
//!
//! Without `--payload`, the proof hash of another fresh sample is embedded.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_wgan_stego::{
    data::pixels::{decode_rgb, encode_png, tensor_to_image},
    proof::proof,
    stego,
    utils::load_checkpoint,
};

/// Hide a payload in an image sampled from a trained generator
#[derive(Parser)]
#[command(name = "embed_proof")]
#[command(about = "Generate an image and embed a payload with LSB steganography")]
struct Args {
    /// Checkpoint directory holding generator.pt and meta.json
    #[arg(short, long)]
    model: PathBuf,

    /// Payload to embed; defaults to a fresh proof hash
    #[arg(short, long)]
    payload: Option<String>,

    /// Output PNG file
    #[arg(short, long, default_value = "embedded.png")]
    output: PathBuf,

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

    let device = if args.gpu && tch::Cuda::is_available() {
        tch::Device::Cuda(0)
    } else {
        tch::Device::Cpu
    };

    let (model, meta) = load_checkpoint(&args.model, device)?;
    info!(
        "Loaded generator from {} (trained {} epochs)",
        args.model.display(),
        meta.epochs
    );

    let payload = match args.payload {
        Some(p) => p,
        None => proof(&model.generator, device)?,
    };

    let image = tensor_to_image(&model.generate(1))?;
    let embedded = stego::embed(&image, &payload)?;
    let png = encode_png(&embedded)?;
    std::fs::write(&args.output, &png)?;

    // Verify the round trip through the written file
    let reloaded = decode_rgb(&std::fs::read(&args.output)?)?;
    let recovered = stego::extract(&reloaded)?;
    if recovered != payload {
        bail!("round trip mismatch: embedded {:?}, read back {:?}", payload, recovered);
    }

    info!("Embedded payload in {}", args.output.display());
    println!("{}", payload);

    Ok(())
}

//! WGAN-GP training and steganographic proof embedding
//!
//! Main entry point providing CLI interface for:
//! - Training a tenant model on a directory of images
//! - Generating an image with an embedded payload
//! - Extracting a payload from an image
//! - Recomputing a proof hash from a stored generator

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_wgan_stego::{
    pipeline::{ExtractMode, Studio, TrainRequest, UploadedImage, PAYLOAD_HEADER},
    tenant::Tenant,
    utils::Config,
};

/// WGAN-GP image generator with LSB proof embedding
#[derive(Parser)]
#[command(name = "wgan_stego")]
#[command(version = "0.1.0")]
#[command(about = "Train per-tenant image GANs and hide proofs in their output")]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model for a tenant from a directory of images
    Train {
        /// Tenant user name
        #[arg(short, long)]
        username: String,

        /// Tenant model name
        #[arg(short, long)]
        model_name: String,

        /// Directory holding the training images
        #[arg(short, long)]
        images: PathBuf,

        /// Number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Latent dimension size
        #[arg(long)]
        latent_dim: Option<i64>,

        /// Batch size
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(long)]
        lr: Option<f64>,

        /// Critic steps per generator step
        #[arg(long)]
        n_critic: Option<usize>,

        /// Gradient penalty weight
        #[arg(long)]
        lambda_gp: Option<f64>,
    },

    /// Generate an image with an embedded payload
    Generate {
        /// Tenant user name
        #[arg(short, long)]
        username: String,

        /// Tenant model name
        #[arg(short, long)]
        model_name: String,

        /// Payload to embed, e.g. a block hash
        #[arg(short, long)]
        payload: String,

        /// Output PNG path
        #[arg(short, long, default_value = "embedded.png")]
        output: PathBuf,
    },

    /// Extract an embedded payload from an image
    Extract {
        /// Image to read
        #[arg(short, long)]
        input: PathBuf,

        /// Also print the payload as a response header line
        #[arg(long)]
        header: bool,
    },

    /// Compute a fresh proof hash from a stored generator
    Proof {
        /// Tenant user name
        #[arg(short, long)]
        username: String,

        /// Tenant model name
        #[arg(short, long)]
        model_name: String,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { output } = &cli.command {
        return init_config(output);
    }

    let config = load_config(&cli.config)?;
    let studio = Studio::new(config)?;
    info!("Using device: {:?}", studio.device());

    match cli.command {
        Commands::Train {
            username,
            model_name,
            images,
            epochs,
            latent_dim,
            batch_size,
            lr,
            n_critic,
            lambda_gp,
        } => {
            let mut training = studio.config().training.clone();
            if let Some(v) = epochs {
                training.epochs = v;
            }
            if let Some(v) = latent_dim {
                training.latent_dim = v;
            }
            if let Some(v) = batch_size {
                training.batch_size = v;
            }
            if let Some(v) = lr {
                training.lr = v;
            }
            if let Some(v) = n_critic {
                training.n_critic = v;
            }
            if let Some(v) = lambda_gp {
                training.lambda_gp = v;
            }

            let request = TrainRequest {
                tenant: Tenant::new(username, model_name)?,
                images: read_uploads(&images)?,
                training,
            };
            let outcome = studio.train(request)?;

            println!("Training complete ({} epochs)", outcome.epochs);
            println!("generator_model: {}", outcome.generator_path.display());
            println!("critic_model: {}", outcome.critic_path.display());
            println!("ai_proof: {}", outcome.proof);
        }
        Commands::Generate {
            username,
            model_name,
            payload,
            output,
        } => {
            let tenant = Tenant::new(username, model_name)?;
            let png = studio.generate_embedded(&tenant, &payload)?;
            std::fs::write(&output, png)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("Saved embedded image to {}", output.display());
        }
        Commands::Extract { input, header } => {
            let bytes =
                std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let mode = if header {
                ExtractMode::WithImage
            } else {
                ExtractMode::PayloadOnly
            };
            let extraction = studio.extract(&bytes, mode)?;
            if extraction.image.is_some() {
                println!("{}: {}", PAYLOAD_HEADER, extraction.payload);
            } else {
                println!("{}", extraction.payload);
            }
        }
        Commands::Proof {
            username,
            model_name,
        } => {
            let tenant = Tenant::new(username, model_name)?;
            println!("{}", studio.proof(&tenant)?);
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}

/// Load the configuration file, falling back to defaults when it is absent
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Ok(Config::load(path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Read every regular file directly under `dir` as an upload
fn read_uploads(dir: &Path) -> Result<Vec<UploadedImage>> {
    let mut uploads = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        uploads.push(UploadedImage::new(name, std::fs::read(entry.path())?));
    }
    info!("Read {} files from {}", uploads.len(), dir.display());
    Ok(uploads)
}

/// Initialize default configuration file
fn init_config(output: &str) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    info!("Created default configuration at {}", output);
    Ok(())
}

//! Generator network for the WGAN
//!
//! The Generator maps latent noise vectors to 64x64 RGB images.
//! Architecture uses five transposed 2D convolutions, each upsampling stage
//! followed by BatchNorm and ReLU except the last, which applies Tanh.

use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

use super::init::LayerKind;
use crate::error::{Result, StegoGanError};

/// Side length of generated images
pub const IMAGE_SIZE: i64 = 64;

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Feature maps of the last hidden stage; earlier stages use 2x, 4x, 8x
    pub feature_maps: i64,
    /// Number of output channels
    pub channels: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            feature_maps: 64,
            channels: 3,
        }
    }
}

/// One transposed convolution with its optional normalization
#[derive(Debug)]
struct UpsampleStage {
    conv: nn::ConvTranspose2D,
    norm: Option<nn::BatchNorm>,
}

impl UpsampleStage {
    fn new(vs: &nn::Path, c_in: i64, c_out: i64, stride: i64, padding: i64, last: bool) -> Self {
        let conv = nn::conv_transpose2d(
            vs / "conv",
            c_in,
            c_out,
            4,
            LayerKind::ConvolutionLike.conv_transpose_config(stride, padding),
        );
        let norm = (!last).then(|| {
            nn::batch_norm2d(
                vs / "bn",
                c_out,
                LayerKind::NormalizationLike.batch_norm_config(),
            )
        });
        Self { conv, norm }
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let x = self.conv.forward(xs);
        match &self.norm {
            Some(bn) => bn.forward_t(&x, train).relu(),
            None => x.tanh(),
        }
    }
}

/// Generator network
///
/// Architecture (`f` = feature_maps):
/// 1. latent -> 8f @ 4x4 (stride 1, no padding)
/// 2. 8f -> 4f @ 8x8, 4f -> 2f @ 16x16, 2f -> f @ 32x32 (stride 2, padding 1)
/// 3. f -> channels @ 64x64 with Tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    stages: Vec<UpsampleStage>,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let f = config.feature_maps;
        let widths = [config.latent_dim, f * 8, f * 4, f * 2, f, config.channels];

        let stages = (0..5)
            .map(|i| {
                let (stride, padding) = if i == 0 { (1, 0) } else { (2, 1) };
                UpsampleStage::new(
                    &(vs / format!("stage{}", i)),
                    widths[i],
                    widths[i + 1],
                    stride,
                    padding,
                    i == 4,
                )
            })
            .collect();

        Self { config, stages }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim) or (batch_size, latent_dim, 1, 1)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, 64, 64) with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let x = noise.view([batch_size, self.config.latent_dim, 1, 1]);
        self.stages
            .iter()
            .fold(x, |x, stage| stage.forward_t(&x, train))
    }

    /// Generate images in inference mode after checking the latent shape
    pub fn generate(&self, noise: &Tensor) -> Result<Tensor> {
        let size = noise.size();
        let latent_ok = match size.as_slice() {
            [_, d] | [_, d, 1, 1] => *d == self.config.latent_dim,
            _ => false,
        };
        if !latent_ok {
            return Err(StegoGanError::InvalidConfig(format!(
                "latent batch of shape {:?} does not match latent_dim {}",
                size, self.config.latent_dim
            )));
        }
        Ok(self.forward_t(noise, false))
    }

    /// Draw `num_samples` standard-normal latent vectors
    pub fn sample_noise(&self, num_samples: i64, device: Device) -> Tensor {
        Tensor::randn([num_samples, self.config.latent_dim], (Kind::Float, device))
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

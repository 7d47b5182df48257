//! Critic network for the WGAN
//!
//! The Critic scores images with an unbounded real value (no sigmoid).
//! It mirrors the generator with five strided 2D convolutions and uses no
//! normalization, since batch statistics would mix samples and break the
//! per-sample gradient the penalty is computed from.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::init::LayerKind;

/// Negative slope of the critic's leaky rectifier
pub const LEAKY_SLOPE: f64 = 0.2;

/// Critic network configuration
#[derive(Debug, Clone)]
pub struct CriticConfig {
    /// Number of input channels
    pub channels: i64,
    /// Feature maps of the first stage; later stages use 2x, 4x, 8x
    pub feature_maps: i64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            channels: 3,
            feature_maps: 64,
        }
    }
}

/// Critic network
///
/// Architecture (`f` = feature_maps):
/// 1. channels -> f -> 2f -> 4f -> 8f, stride 2, LeakyReLU(0.2) after each
/// 2. 8f @ 4x4 -> 1 with a 4x4 valid convolution (a linear projection)
#[derive(Debug)]
pub struct Critic {
    config: CriticConfig,
    convs: Vec<nn::Conv2D>,
}

impl Critic {
    /// Create a new Critic network
    pub fn new(vs: &nn::Path, config: CriticConfig) -> Self {
        let f = config.feature_maps;
        let widths = [config.channels, f, f * 2, f * 4, f * 8, 1];

        let convs = (0..5)
            .map(|i| {
                let (stride, padding) = if i == 4 { (1, 0) } else { (2, 1) };
                nn::conv2d(
                    vs / format!("conv{}", i + 1),
                    widths[i],
                    widths[i + 1],
                    4,
                    LayerKind::ConvolutionLike.conv_config(stride, padding),
                )
            })
            .collect();

        Self { config, convs }
    }

    /// Score a batch of images
    ///
    /// # Arguments
    ///
    /// * `images` - Tensor of shape (batch_size, channels, 64, 64)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size,) with one unbounded score per image
    pub fn score(&self, images: &Tensor) -> Tensor {
        let last = self.convs.len() - 1;
        let x = self
            .convs
            .iter()
            .enumerate()
            .fold(images.shallow_clone(), |x, (i, conv)| {
                let x = conv.forward(&x);
                if i < last {
                    leaky_relu(&x, LEAKY_SLOPE)
                } else {
                    x
                }
            });
        x.view([-1])
    }

    /// Get configuration
    pub fn config(&self) -> &CriticConfig {
        &self.config
    }
}

impl ModuleT for Critic {
    fn forward_t(&self, xs: &Tensor, _train: bool) -> Tensor {
        self.score(xs)
    }
}

/// Leaky rectifier with an explicit slope, `max(x, slope * x)` for `slope < 1`
pub fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

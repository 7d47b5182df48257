//! Weight initialization by layer kind
//!
//! Every layer is tagged with a [`LayerKind`] when it is built, and the kind
//! decides how its parameters are drawn:
//!
//! | Kind | Weight | Bias |
//! |---|---|---|
//! | `ConvolutionLike` | N(0, 0.02) | none (layers are built without bias) |
//! | `NormalizationLike` | N(1, 0.02) | 0 |
//! | `Other` | backend default | backend default |

use tch::nn;

/// Standard deviation shared by every DCGAN initializer
pub const INIT_STD: f64 = 0.02;

/// Closed set of layer families that carry their own initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Convolutions and transposed convolutions
    ConvolutionLike,
    /// Batch normalization
    NormalizationLike,
    /// Anything else (activations, reshapes)
    Other,
}

impl LayerKind {
    /// Initializer for the layer's weight (scale for normalization)
    pub fn weight_init(self) -> Option<nn::Init> {
        match self {
            LayerKind::ConvolutionLike => Some(nn::Init::Randn {
                mean: 0.0,
                stdev: INIT_STD,
            }),
            LayerKind::NormalizationLike => Some(nn::Init::Randn {
                mean: 1.0,
                stdev: INIT_STD,
            }),
            LayerKind::Other => None,
        }
    }

    /// Initializer for the layer's bias
    pub fn bias_init(self) -> Option<nn::Init> {
        match self {
            LayerKind::NormalizationLike => Some(nn::Init::Const(0.0)),
            LayerKind::ConvolutionLike | LayerKind::Other => None,
        }
    }

    /// Config for a bias-free 2D convolution of this kind
    pub fn conv_config(self, stride: i64, padding: i64) -> nn::ConvConfig {
        let mut config = nn::ConvConfig {
            stride,
            padding,
            bias: false,
            ..Default::default()
        };
        if let Some(init) = self.weight_init() {
            config.ws_init = init;
        }
        config
    }

    /// Config for a bias-free 2D transposed convolution of this kind
    pub fn conv_transpose_config(self, stride: i64, padding: i64) -> nn::ConvTransposeConfig {
        let mut config = nn::ConvTransposeConfig {
            stride,
            padding,
            bias: false,
            ..Default::default()
        };
        if let Some(init) = self.weight_init() {
            config.ws_init = init;
        }
        config
    }

    /// Config for a batch normalization layer of this kind
    pub fn batch_norm_config(self) -> nn::BatchNormConfig {
        let mut config = nn::BatchNormConfig::default();
        if let Some(init) = self.weight_init() {
            config.ws_init = init;
        }
        if let Some(init) = self.bias_init() {
            config.bs_init = init;
        }
        config
    }
}

//! Proof hashes of freshly generated images
//!
//! A proof is the SHA-256 of one generated image, rendered as 64 lowercase
//! hex characters. The hashed bytes are the generator's raw output for a
//! single latent vector, laid out height x width x channel, each value an
//! `f32` in little-endian byte order (64 * 64 * 3 * 4 = 49152 bytes).
//!
//! Every call draws new noise, so two proofs from the same generator differ.

use sha2::{Digest, Sha256};
use tch::{Device, Tensor};

use crate::data::pixels::hwc_floats;
use crate::error::Result;
use crate::model::Generator;

/// Length of a proof string
pub const PROOF_HEX_LEN: usize = 64;

/// Sample one image from `generator` and hash it
pub fn proof(generator: &Generator, device: Device) -> Result<String> {
    let noise = generator.sample_noise(1, device);
    let image = tch::no_grad(|| generator.generate(&noise))?;
    hash_image(&image)
}

/// Hash a `(1, C, H, W)` or `(C, H, W)` image tensor with the proof byte layout
pub fn hash_image(image: &Tensor) -> Result<String> {
    let image = if image.dim() == 4 {
        image.squeeze_dim(0)
    } else {
        image.shallow_clone()
    };

    let mut hasher = Sha256::new();
    for value in hwc_floats(&image)? {
        hasher.update(value.to_le_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `s` has the shape of a proof string
pub fn is_proof(s: &str) -> bool {
    s.len() == PROOF_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

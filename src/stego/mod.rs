//! Least-significant-bit steganography on RGB images
//!
//! Bits are stored in bit 0 of every channel value, visiting rows top to
//! bottom, pixels left to right and channels in R, G, B order. That is the
//! raw buffer order of [`image::RgbImage`], so the carrier is simply its
//! flat sample slice. See [`frame`] for the payload framing.
//!
//! Embedded payloads survive a lossless save/reload (PNG). They do not
//! survive lossy re-encoding; extraction then reports a format error.

pub mod frame;

use image::RgbImage;
use tracing::debug;

use crate::error::{Result, StegoGanError};
use frame::{BitReader, CHECK_BYTES, MAGIC};

/// Number of payload-carrying bits in `img` (3 x width x height)
pub fn capacity_bits(img: &RgbImage) -> usize {
    img.as_raw().len()
}

/// Largest payload, in bytes, that fits in `img`
pub fn max_payload_bytes(img: &RgbImage) -> usize {
    capacity_bits(img).saturating_sub(frame::OVERHEAD_BITS) / 8
}

/// Hide `payload` in a copy of `img`
///
/// Fails with `CapacityExceeded` when the framed payload needs more bits
/// than the image has channel values; `img` itself is never modified.
pub fn embed(img: &RgbImage, payload: &str) -> Result<RgbImage> {
    let required_bits = frame::frame_bits(payload.len());
    let capacity_bits = capacity_bits(img);
    if required_bits > capacity_bits {
        return Err(StegoGanError::CapacityExceeded {
            required_bits,
            capacity_bits,
        });
    }

    let framed = frame::encode(payload.as_bytes())?;
    let mut out = img.clone();
    let channels: &mut [u8] = &mut out;
    for (value, bit) in channels.iter_mut().zip(frame::bits(&framed)) {
        *value = (*value & !1) | bit;
    }

    debug!(
        "Embedded {} payload bytes using {}/{} bits",
        payload.len(),
        required_bits,
        capacity_bits
    );
    Ok(out)
}

/// Recover a payload hidden by [`embed`]
///
/// Fails with `NoEmbeddedPayload` when the image does not start with the
/// frame marker, and with `CorruptPayload` when the marker is present but
/// the length, checksum or UTF-8 decoding does not hold up.
pub fn extract(img: &RgbImage) -> Result<String> {
    let mut reader = BitReader::new(img.as_raw());

    let magic = reader
        .read_bytes(MAGIC.len())
        .ok_or(StegoGanError::NoEmbeddedPayload)?;
    if magic != MAGIC {
        return Err(StegoGanError::NoEmbeddedPayload);
    }

    let len_bytes = reader
        .read_bytes(4)
        .ok_or_else(|| StegoGanError::CorruptPayload("truncated length field".to_string()))?;
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

    if frame::frame_bits(len) > capacity_bits(img) {
        return Err(StegoGanError::CorruptPayload(format!(
            "declared length {} exceeds image capacity",
            len
        )));
    }

    let payload = reader
        .read_bytes(len)
        .ok_or_else(|| StegoGanError::CorruptPayload("truncated payload".to_string()))?;
    let check = reader
        .read_bytes(CHECK_BYTES)
        .ok_or_else(|| StegoGanError::CorruptPayload("truncated checksum".to_string()))?;
    if check[..] != frame::checksum(&payload)[..] {
        return Err(StegoGanError::CorruptPayload("checksum mismatch".to_string()));
    }

    String::from_utf8(payload)
        .map_err(|_| StegoGanError::CorruptPayload("payload is not valid UTF-8".to_string()))
}

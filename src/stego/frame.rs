//! Frame layout of an embedded payload
//!
//! ```text
//! MAGIC "LSB1" (4 bytes) | LENGTH u32 big-endian (4 bytes) | PAYLOAD | CHECK (4 bytes)
//! ```
//!
//! `CHECK` is the first four bytes of SHA-256(PAYLOAD). Every byte is
//! written most significant bit first.

use sha2::{Digest, Sha256};

use crate::error::{Result, StegoGanError};

/// Marker opening every frame
pub const MAGIC: [u8; 4] = *b"LSB1";

/// Bytes before the payload: magic + length
pub const HEADER_BYTES: usize = 8;

/// Bytes after the payload
pub const CHECK_BYTES: usize = 4;

/// Fixed frame overhead in bits
pub const OVERHEAD_BITS: usize = (HEADER_BYTES + CHECK_BYTES) * 8;

/// Integrity tag stored after the payload
pub fn checksum(payload: &[u8]) -> [u8; CHECK_BYTES] {
    let digest = Sha256::digest(payload);
    let mut check = [0u8; CHECK_BYTES];
    check.copy_from_slice(&digest[..CHECK_BYTES]);
    check
}

/// Number of carrier bits a payload of `len` bytes occupies
pub fn frame_bits(len: usize) -> usize {
    len * 8 + OVERHEAD_BITS
}

/// Build the complete frame for `payload`
pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| StegoGanError::CapacityExceeded {
        required_bits: frame_bits(payload.len()),
        capacity_bits: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(payload.len() + HEADER_BYTES + CHECK_BYTES);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&checksum(payload));
    Ok(frame)
}

/// Iterate over the bits of `bytes`, most significant bit of each byte first
pub fn bits(bytes: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1))
}

/// Reads whole bytes out of the least significant bits of a channel buffer
pub struct BitReader<'a> {
    channels: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first channel value
    pub fn new(channels: &'a [u8]) -> Self {
        Self { channels, pos: 0 }
    }

    /// Bits left in the carrier
    pub fn remaining_bits(&self) -> usize {
        self.channels.len() - self.pos
    }

    /// Read `n` bytes, or None when the carrier runs out
    pub fn read_bytes(&mut self, n: usize) -> Option<Vec<u8>> {
        if n.checked_mul(8)? > self.remaining_bits() {
            return None;
        }
        let out = self.channels[self.pos..self.pos + n * 8]
            .chunks_exact(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &c| (acc << 1) | (c & 1)))
            .collect();
        self.pos += n * 8;
        Some(out)
    }
}

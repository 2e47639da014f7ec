//! Proof of work: targets, compact bits and header validation

use crate::codec::{hash256, reverse_bytes};
use crate::constants::BLOCK_HEADER_SIZE;
use crate::error::{ConsensusError, Result};
use crate::types::*;
use std::fmt;

/// 256-bit difficulty target, big-endian
///
/// Byte-array ordering is numeric ordering, so targets and reversed header
/// hashes compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(pub [u8; 32]);

impl Target {
    pub const MAX: Target = Target([0xff; 32]);

    /// Parse a big-endian hex threshold
    ///
    /// Shorter strings are left-padded. Longer strings are accepted when the
    /// excess leading digits are zero; a value wider than 256 bits admits
    /// every hash and saturates to [`Target::MAX`].
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let padded;
        let s = if s.len() % 2 == 1 {
            padded = format!("0{}", s);
            padded.as_str()
        } else {
            s
        };
        let bytes = hex::decode(s).map_err(|e| ConsensusError::InvalidTarget(e.to_string()))?;

        let mut out = [0u8; 32];
        if bytes.len() > 32 {
            let (excess, tail) = bytes.split_at(bytes.len() - 32);
            if excess.iter().any(|&b| b != 0) {
                return Ok(Target::MAX);
            }
            out.copy_from_slice(tail);
        } else {
            out[32 - bytes.len()..].copy_from_slice(&bytes);
        }
        Ok(Target(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Convert a full target into compact "bits"
///
/// exponent = number of significant bytes, coefficient = the leading three of
/// them. A coefficient with its top bit set would read as negative, so it is
/// shifted down a byte and the exponent bumped.
///
/// The default target `0000ffff00…` therefore encodes as `0x1f00ffff`, the
/// value written into headers, and not as the unnormalized `0x1effff00`.
pub fn target_to_bits(target: &Target) -> u32 {
    let first = match target.0.iter().position(|&b| b != 0) {
        Some(i) => i,
        None => return 0,
    };
    let significant = &target.0[first..];
    let mut size = significant.len() as u32;

    let mut coefficient = significant
        .iter()
        .take(3)
        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
    if size < 3 {
        coefficient <<= 8 * (3 - size);
    }

    if coefficient & 0x0080_0000 != 0 {
        coefficient >>= 8;
        size += 1;
    }

    (size << 24) | coefficient
}

/// Expand compact "bits" into a full target
pub fn expand_bits(bits: u32) -> Result<Target> {
    if bits & 0x0080_0000 != 0 {
        return Err(ConsensusError::InvalidTarget(format!("negative compact target {:#010x}", bits)));
    }
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x007f_ffff;

    let mut out = [0u8; 32];
    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        out[28..].copy_from_slice(&value.to_be_bytes());
        return Ok(Target(out));
    }

    let mantissa_bytes = &mantissa.to_be_bytes()[1..];
    for (k, &b) in mantissa_bytes.iter().enumerate() {
        // Byte k of the mantissa lands at 32 - exponent + k
        match (32 + k).checked_sub(exponent) {
            Some(idx) => out[idx] = b,
            None if b == 0 => {}
            None => {
                return Err(ConsensusError::InvalidTarget(format!("compact target {:#010x} overflows", bits)));
            }
        }
    }
    Ok(Target(out))
}

/// Serialize a block header to its 80-byte wire form
pub fn serialize_header(header: &BlockHeader) -> [u8; BLOCK_HEADER_SIZE] {
    let mut bytes = [0u8; BLOCK_HEADER_SIZE];
    bytes[0..4].copy_from_slice(&header.version.to_le_bytes());
    bytes[4..36].copy_from_slice(&header.prev_block_hash);
    bytes[36..68].copy_from_slice(&header.merkle_root);
    bytes[68..72].copy_from_slice(&header.timestamp.to_le_bytes());
    bytes[72..76].copy_from_slice(&header.bits.to_le_bytes());
    bytes[76..80].copy_from_slice(&header.nonce.to_le_bytes());
    bytes
}

/// Parse an 80-byte header
pub fn deserialize_header(bytes: &[u8]) -> Result<BlockHeader> {
    if bytes.len() != BLOCK_HEADER_SIZE {
        return Err(ConsensusError::MalformedHeader(bytes.len()));
    }
    let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

    let mut prev_block_hash = [0u8; 32];
    prev_block_hash.copy_from_slice(&bytes[4..36]);
    let mut merkle_root = [0u8; 32];
    merkle_root.copy_from_slice(&bytes[36..68]);

    Ok(BlockHeader {
        version: u32_at(0) as i32,
        prev_block_hash,
        merkle_root,
        timestamp: u32_at(68),
        bits: u32_at(72),
        nonce: u32_at(76),
    })
}

/// Header hash as a big-endian number (hash256 reversed)
pub fn header_hash_value(header_bytes: &[u8]) -> [u8; 32] {
    reverse_bytes(&hash256(header_bytes))
}

/// CheckProofOfWork: reversed hash256(header) ≤ target
pub fn check_proof_of_work(header_bytes: &[u8], target: &Target) -> bool {
    Target(header_hash_value(header_bytes)) <= *target
}

/// Validate a finished header: exactly 80 bytes and hash ≤ target
pub fn validate_header(header_bytes: &[u8], target: &Target) -> Result<()> {
    if header_bytes.len() != BLOCK_HEADER_SIZE {
        return Err(ConsensusError::MalformedHeader(header_bytes.len()));
    }

    let hash = header_hash_value(header_bytes);
    if Target(hash) > *target {
        return Err(ConsensusError::TargetNotMet {
            hash: hex::encode(hash),
            target: target.to_hex(),
        });
    }
    Ok(())
}

/// Hex convenience wrapper around [`validate_header`]
pub fn validate_header_hex(header_hex: &str, target_hex: &str) -> Result<()> {
    let header_bytes = hex::decode(header_hex)?;
    validate_header(&header_bytes, &Target::from_hex(target_hex)?)
}

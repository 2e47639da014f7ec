//! Byte-level encoding primitives
//!
//! CompactSize varints, fixed-width little-endian integers, byte-order
//! reversal and the hash functions every identifier is built from.

use crate::error::{ConsensusError, Result};
use crate::types::{ByteString, Hash};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Encode a number as a CompactSize varint
///
/// ```
/// use consensus_miner::codec::encode_varint;
///
/// assert_eq!(encode_varint(0xfc), vec![0xfc]);
/// assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0x00]);
/// assert_eq!(encode_varint(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
/// ```
pub fn encode_varint(value: u64) -> ByteString {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Decode a CompactSize varint, returning the value and bytes consumed
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let prefix = *data
        .first()
        .ok_or_else(|| ConsensusError::Serialization("empty varint".to_string()))?;

    let width = match prefix {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        n => return Ok((n as u64, 1)),
    };

    let payload = data
        .get(1..1 + width)
        .ok_or_else(|| ConsensusError::Serialization("truncated varint".to_string()))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(payload);
    Ok((u64::from_le_bytes(buf), 1 + width))
}

/// Fixed-width little-endian encoding of the low `width` bytes of `value`
pub fn le_uint(value: u64, width: usize) -> ByteString {
    debug_assert!(width <= 8);
    value.to_le_bytes()[..width].to_vec()
}

/// Reverse the byte order of a hex-encoded buffer
pub fn reverse_hex(hex_input: &str) -> Result<String> {
    let mut bytes = hex::decode(hex_input)?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

/// Reverse a 32-byte identifier between display and internal order
pub fn reverse_bytes(hash: &Hash) -> Hash {
    let mut out = *hash;
    out.reverse();
    out
}

/// SHA-256 applied twice
pub fn hash256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// Single SHA-256
pub fn sha256(data: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(data));
    hash
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&Ripemd160::digest(Sha256::digest(data)));
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_varint_boundaries() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(0xfc), vec![0xfc]);
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode_varint(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(encode_varint(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(encode_varint(0xffffffff), vec![0xfe, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            encode_varint(0x100000000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_varint_roundtrip_boundaries() {
        for n in [0u64, 0xfc, 0xfd, 0xffff, 0x10000, 0xffffffff, 0x100000000] {
            let encoded = encode_varint(n);
            let (decoded, used) = decode_varint(&encoded).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(used, encoded.len());
            assert_eq!(encode_varint(decoded), encoded);
        }
    }

    #[test]
    fn test_decode_varint_truncated() {
        assert!(decode_varint(&[]).is_err());
        assert!(decode_varint(&[0xfd, 0x01]).is_err());
        assert!(decode_varint(&[0xff, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_le_uint() {
        assert_eq!(le_uint(1, 4), vec![1, 0, 0, 0]);
        assert_eq!(le_uint(0xffffffff, 4), vec![0xff; 4]);
        assert_eq!(le_uint(100000, 8), vec![0xa0, 0x86, 0x01, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reverse_hex() {
        assert_eq!(reverse_hex("0102ab").unwrap(), "ab0201");
        assert_eq!(reverse_hex("").unwrap(), "");
        assert!(reverse_hex("0g").is_err());
    }

    #[test]
    fn test_reverse_bytes_involution() {
        let mut h = [0u8; 32];
        h[0] = 1;
        let r = reverse_bytes(&h);
        assert_eq!(r[31], 1);
        assert_eq!(reverse_bytes(&r), h);
    }

    #[test]
    fn test_hash256_empty() {
        assert_eq!(
            hex::encode(hash256(&[])),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_hash256_is_double_sha256() {
        let data = b"hello world";
        assert_eq!(hash256(data), sha256(&sha256(data)));
    }

    #[test]
    fn test_hash160_empty() {
        assert_eq!(hex::encode(hash160(&[])), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb");
    }
}

//! Merkle root reduction over 32-byte identifiers
//!
//! Used for both the txid tree (header) and the wtxid tree (witness commitment).

use crate::codec::{hash256, reverse_bytes};
use crate::types::Hash;

/// ComputeMerkleRoot: ℍ* → ℍ ∪ {⊥}
///
/// For display-order ids:
/// 1. If the list is empty: return None
/// 2. Reverse every id into internal order
/// 3. Replace each pair (a, b) with hash256(a ‖ b), pairing an odd last
///    node with itself, until one node remains (at least one round)
/// 4. Return the remaining node, in internal order (as written into headers)
pub fn merkle_root(ids: &[Hash]) -> Option<Hash> {
    if ids.is_empty() {
        return None;
    }

    let mut level: Vec<Hash> = ids.iter().map(reverse_bytes).collect();

    // A singleton list is paired with itself too
    loop {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                let mut combined = [0u8; 64];
                combined[..32].copy_from_slice(left);
                combined[32..].copy_from_slice(right);
                hash256(&combined)
            })
            .collect();
        if level.len() == 1 {
            break;
        }
    }

    level.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Hash {
        let mut h = [0u8; 32];
        h[0] = byte;
        h[31] = byte.wrapping_mul(3);
        h
    }

    fn pair_hash(a: &Hash, b: &Hash) -> Hash {
        let mut data = a.to_vec();
        data.extend_from_slice(b);
        hash256(&data)
    }

    #[test]
    fn test_empty() {
        assert_eq!(merkle_root(&[]), None);
    }

    #[test]
    fn test_singleton_pairs_with_itself() {
        let x = id(7);
        let rx = reverse_bytes(&x);
        assert_eq!(merkle_root(&[x]), Some(pair_hash(&rx, &rx)));
    }

    #[test]
    fn test_two_leaves() {
        let (a, b) = (id(1), id(2));
        let expected = pair_hash(&reverse_bytes(&a), &reverse_bytes(&b));
        assert_eq!(merkle_root(&[a, b]), Some(expected));
    }

    #[test]
    fn test_three_leaves_duplicates_last() {
        let (a, b, c) = (id(1), id(2), id(3));
        let (ra, rb, rc) = (reverse_bytes(&a), reverse_bytes(&b), reverse_bytes(&c));
        let left = pair_hash(&ra, &rb);
        let right = pair_hash(&rc, &rc);
        assert_eq!(merkle_root(&[a, b, c]), Some(pair_hash(&left, &right)));
    }

    #[test]
    fn test_order_sensitive() {
        let (a, b) = (id(1), id(2));
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn test_all_zero_singleton() {
        let zero = [0u8; 32];
        assert_eq!(merkle_root(&[zero]), Some(pair_hash(&zero, &zero)));
    }
}

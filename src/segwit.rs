//! Witness commitment for segwit blocks
//!
//! The coinbase commits to every wtxid in the block through an OP_RETURN
//! output: `6a24aa21a9ed ‖ hash256(witnessRoot ‖ reservedValue)`.

use crate::codec::hash256;
use crate::constants::WITNESS_COMMITMENT_PREFIX;
use crate::merkle::merkle_root;
use crate::types::*;

/// wtxid of the coinbase inside the witness tree
pub const COINBASE_WTXID: Hash = [0u8; 32];

/// Witness Merkle root over `[coinbase wtxid = 0³²] ‖ [wtxid(tx) …]`
pub fn compute_witness_merkle_root(transactions: &[PreparedTransaction]) -> Hash {
    let mut wtxids = Vec::with_capacity(transactions.len() + 1);
    wtxids.push(COINBASE_WTXID);
    wtxids.extend(transactions.iter().map(|tx| tx.wtxid));

    // The list always holds the coinbase entry, so a root exists
    merkle_root(&wtxids).unwrap_or(COINBASE_WTXID)
}

/// WitnessCommitment = hash256(WitnessRoot ‖ reservedValue)
pub fn calculate_witness_commitment(transactions: &[PreparedTransaction], reserved_value: &Hash) -> Hash {
    let root = compute_witness_merkle_root(transactions);
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(&root);
    data[32..].copy_from_slice(reserved_value);
    hash256(&data)
}

/// Locking script of the commitment output
pub fn witness_commitment_script(commitment: &Hash) -> ByteString {
    let mut script = WITNESS_COMMITMENT_PREFIX.to_vec();
    script.extend_from_slice(commitment);
    script
}

/// Extract the commitment from a script carrying the commitment prefix
pub fn extract_witness_commitment(script: &[u8]) -> Option<Hash> {
    let commitment = script.strip_prefix(&WITNESS_COMMITMENT_PREFIX[..])?;
    commitment.get(..32)?.try_into().ok()
}

/// True if some coinbase output carries exactly this commitment
pub fn is_witness_commitment_valid(coinbase_tx: &Transaction, commitment: &Hash) -> bool {
    coinbase_tx
        .outputs
        .iter()
        .filter_map(|output| extract_witness_commitment(&output.script_pubkey))
        .any(|found| found == *commitment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::reverse_bytes;

    fn prepared(wtxid_byte: u8) -> PreparedTransaction {
        PreparedTransaction {
            transaction: Transaction {
                version: 1,
                inputs: vec![],
                outputs: vec![],
                lock_time: 0,
                fee: None,
            },
            txid: [wtxid_byte; 32],
            wtxid: [wtxid_byte; 32],
            fee: 0,
            weight: 1,
        }
    }

    #[test]
    fn test_witness_root_coinbase_first() {
        let txs = vec![prepared(5)];
        let expected = merkle_root(&[[0u8; 32], [5u8; 32]]).unwrap();
        assert_eq!(compute_witness_merkle_root(&txs), expected);
    }

    #[test]
    fn test_witness_root_coinbase_only() {
        let zero = [0u8; 32];
        let mut both = [0u8; 64];
        both[..32].copy_from_slice(&zero);
        assert_eq!(compute_witness_merkle_root(&[]), hash256(&both));
    }

    #[test]
    fn test_commitment_combines_reserved_value() {
        let txs = vec![prepared(1), prepared(2)];
        let root = compute_witness_merkle_root(&txs);
        let mut data = root.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        assert_eq!(calculate_witness_commitment(&txs, &[0u8; 32]), hash256(&data));
        assert_ne!(
            calculate_witness_commitment(&txs, &[0u8; 32]),
            calculate_witness_commitment(&txs, &[1u8; 32])
        );
    }

    #[test]
    fn test_commitment_order_sensitive() {
        let a = vec![prepared(1), prepared(2)];
        let b = vec![prepared(2), prepared(1)];
        assert_ne!(
            calculate_witness_commitment(&a, &[0u8; 32]),
            calculate_witness_commitment(&b, &[0u8; 32])
        );
    }

    #[test]
    fn test_commitment_script_roundtrip() {
        let commitment = reverse_bytes(&[9u8; 32]);
        let script = witness_commitment_script(&commitment);
        assert_eq!(script.len(), 38);
        assert_eq!(hex::encode(&script[..6]), "6a24aa21a9ed");
        assert_eq!(extract_witness_commitment(&script), Some(commitment));
    }

    #[test]
    fn test_extract_rejects_wrong_prefix_or_length() {
        let mut script = vec![0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xee];
        script.extend_from_slice(&[1u8; 32]);
        assert_eq!(extract_witness_commitment(&script), None);

        let short = witness_commitment_script(&[1u8; 32])[..30].to_vec();
        assert_eq!(extract_witness_commitment(&short), None);
        assert_eq!(extract_witness_commitment(&[0x51]), None);
    }

    #[test]
    fn test_is_witness_commitment_valid() {
        let commitment = [3u8; 32];
        let coinbase = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![
                TransactionOutput { value: 50, script_pubkey: vec![0x51] },
                TransactionOutput { value: 0, script_pubkey: witness_commitment_script(&commitment) },
            ],
            lock_time: 0,
            fee: None,
        };
        assert!(is_witness_commitment_valid(&coinbase, &commitment));
        assert!(!is_witness_commitment_valid(&coinbase, &[4u8; 32]));
    }
}

//! Candidate transaction checks and block selection
//!
//! Preprocessing derives identifiers without judging validity. This layer
//! decides which prepared transactions may enter a block.

use crate::types::*;
use std::collections::HashSet;
use tracing::debug;

/// CheckTransaction: structural and fee checks for one candidate
///
/// 1. At least one input and one output
/// 2. Every input resolves its prevout
/// 3. Fee is not negative
pub fn check_transaction(tx: &PreparedTransaction) -> ValidationResult {
    let record = &tx.transaction;

    if record.inputs.is_empty() {
        return ValidationResult::Invalid("Empty inputs".to_string());
    }
    if record.outputs.is_empty() {
        return ValidationResult::Invalid("Empty outputs".to_string());
    }

    if let Some(i) = record.inputs.iter().position(|input| input.prevout.is_none()) {
        return ValidationResult::Invalid(format!("Input {} has no prevout", i));
    }

    if tx.fee < 0 {
        return ValidationResult::Invalid(format!("Negative fee {}", tx.fee));
    }

    ValidationResult::Valid
}

/// Select the transactions to include in a block, preserving order
///
/// Invalid candidates are dropped, and so is any candidate spending an
/// outpoint already spent by an earlier selected one.
pub fn select_transactions(candidates: Vec<PreparedTransaction>) -> Vec<PreparedTransaction> {
    let mut spent: HashSet<(Hash, u32)> = HashSet::new();
    let mut selected = Vec::with_capacity(candidates.len());

    for tx in candidates {
        if let ValidationResult::Invalid(reason) = check_transaction(&tx) {
            debug!(txid = %tx.txid_hex(), %reason, "excluding transaction");
            continue;
        }

        let outpoints: Vec<(Hash, u32)> = tx.transaction.inputs.iter().map(|i| (i.txid, i.vout)).collect();
        let mut unique = HashSet::with_capacity(outpoints.len());
        let conflicts = outpoints
            .iter()
            .any(|outpoint| spent.contains(outpoint) || !unique.insert(*outpoint));
        if conflicts {
            debug!(txid = %tx.txid_hex(), "excluding double spend");
            continue;
        }

        spent.extend(outpoints);
        selected.push(tx);
    }

    debug!(selected = selected.len(), "transaction selection done");
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u8, spends: &[(u8, u32)], fee: i64) -> PreparedTransaction {
        PreparedTransaction {
            transaction: Transaction {
                version: 2,
                inputs: spends
                    .iter()
                    .map(|&(txid, vout)| TransactionInput {
                        txid: [txid; 32],
                        vout,
                        script_sig: vec![],
                        sequence: 0xffffffff,
                        prevout: Some(Prevout { scriptpubkey: vec![0x51], value: 1000 }),
                        witness: None,
                    })
                    .collect(),
                outputs: vec![TransactionOutput { value: 900, script_pubkey: vec![0x51] }],
                lock_time: 0,
                fee: None,
            },
            txid: [id; 32],
            wtxid: [id; 32],
            fee,
            weight: 1,
        }
    }

    #[test]
    fn test_check_transaction_valid() {
        assert_eq!(check_transaction(&candidate(1, &[(9, 0)], 100)), ValidationResult::Valid);
        // Zero fee is acceptable
        assert_eq!(check_transaction(&candidate(1, &[(9, 0)], 0)), ValidationResult::Valid);
    }

    #[test]
    fn test_check_transaction_negative_fee() {
        assert!(matches!(
            check_transaction(&candidate(1, &[(9, 0)], -1)),
            ValidationResult::Invalid(_)
        ));
    }

    #[test]
    fn test_check_transaction_empty_sets() {
        assert!(matches!(check_transaction(&candidate(1, &[], 0)), ValidationResult::Invalid(_)));

        let mut tx = candidate(1, &[(9, 0)], 0);
        tx.transaction.outputs.clear();
        assert!(matches!(check_transaction(&tx), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_missing_prevout() {
        let mut tx = candidate(1, &[(9, 0), (9, 1)], 0);
        tx.transaction.inputs[1].prevout = None;
        assert_eq!(
            check_transaction(&tx),
            ValidationResult::Invalid("Input 1 has no prevout".to_string())
        );
    }

    #[test]
    fn test_select_preserves_order() {
        let txs = vec![candidate(3, &[(9, 0)], 10), candidate(1, &[(9, 1)], 20), candidate(2, &[(8, 0)], 5)];
        let ids: Vec<u8> = select_transactions(txs).iter().map(|t| t.txid[0]).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_select_drops_invalid_and_double_spends() {
        let txs = vec![
            candidate(1, &[(9, 0)], 10),
            candidate(2, &[(9, 0)], 50),
            candidate(3, &[(7, 0)], -5),
            candidate(4, &[(6, 0), (6, 0)], 1),
            candidate(5, &[(6, 0)], 1),
        ];
        let ids: Vec<u8> = select_transactions(txs).iter().map(|t| t.txid[0]).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_select_empty() {
        assert!(select_transactions(vec![]).is_empty());
    }
}

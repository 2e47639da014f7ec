//! Transaction preprocessing: identifiers, fee and weight
//!
//! Pure derivation only. Whether a prepared transaction belongs in a block is
//! decided by [`crate::mempool`].

use crate::codec::{hash256, reverse_bytes};
use crate::constants::TX_WEIGHT_PLACEHOLDER;
use crate::error::{ConsensusError, Result};
use crate::script::{classify_script, ScriptType};
use crate::serialization::{serialize_legacy, serialize_witness};
use crate::types::*;
use std::collections::BTreeMap;

/// Display-order txid: reversed hash256 of the legacy serialization
pub fn compute_txid(tx: &Transaction) -> Hash {
    reverse_bytes(&hash256(&serialize_legacy(tx)))
}

/// Display-order wtxid: reversed hash256 of the witness serialization
pub fn compute_wtxid(tx: &Transaction) -> Hash {
    reverse_bytes(&hash256(&serialize_witness(tx)))
}

/// Fee = Σ prevout values − Σ output values
///
/// Negative results are returned as-is; excluding over-spending transactions
/// is the caller's job.
pub fn calculate_fee(tx: &Transaction) -> Result<i64> {
    let mut total_in: i128 = 0;
    for (i, input) in tx.inputs.iter().enumerate() {
        let prevout = input.prevout.as_ref().ok_or_else(|| {
            ConsensusError::MalformedTransaction(format!("input {} has no prevout", i))
        })?;
        total_in += prevout.value as i128;
    }
    let total_out: i128 = tx.outputs.iter().map(|o| o.value as i128).sum();

    i64::try_from(total_in - total_out)
        .map_err(|_| ConsensusError::MalformedTransaction("fee out of range".to_string()))
}

/// Derive txid, wtxid, fee and weight for a transaction record
///
/// A fee already present on the record is kept.
pub fn preprocess(tx: Transaction) -> Result<PreparedTransaction> {
    let txid = compute_txid(&tx);
    let wtxid = compute_wtxid(&tx);
    let fee = match tx.fee {
        Some(fee) => fee,
        None => calculate_fee(&tx)?,
    };

    Ok(PreparedTransaction {
        transaction: tx,
        txid,
        wtxid,
        fee,
        weight: TX_WEIGHT_PLACEHOLDER,
    })
}

/// Tally of spent output types across a batch of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    pub transactions: usize,
    pub spent_by_type: BTreeMap<ScriptType, usize>,
}

impl PreprocessStats {
    pub fn count(&self, script_type: ScriptType) -> usize {
        self.spent_by_type.get(&script_type).copied().unwrap_or(0)
    }

    fn record(&mut self, prepared: &PreparedTransaction) {
        self.transactions += 1;
        for prevout in prepared.transaction.inputs.iter().filter_map(|i| i.prevout.as_ref()) {
            *self
                .spent_by_type
                .entry(classify_script(&prevout.scriptpubkey))
                .or_insert(0) += 1;
        }
    }
}

/// Preprocess a batch and report statistics
///
/// Stops at the first record that cannot be prepared; the error names its
/// position in the batch.
pub fn preprocess_all(txs: Vec<Transaction>) -> Result<(Vec<PreparedTransaction>, PreprocessStats)> {
    let mut stats = PreprocessStats::default();
    let mut prepared = Vec::with_capacity(txs.len());

    for (index, tx) in txs.into_iter().enumerate() {
        let p = preprocess(tx).map_err(|e| {
            tracing::debug!(index, error = %e, "rejecting transaction record");
            match e {
                ConsensusError::MalformedTransaction(msg) => {
                    ConsensusError::MalformedTransaction(format!("record {}: {}", index, msg))
                }
                other => other,
            }
        })?;
        stats.record(&p);
        prepared.push(p);
    }

    Ok((prepared, stats))
}

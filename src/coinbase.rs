//! Coinbase transaction construction
//!
//! The coinbase has one null input, a reward output and a zero-value witness
//! commitment output, plus a witness holding the reserved value. Its raw form
//! carries marker/flag and witness; its txid is computed over the legacy
//! serialization of the same record.

use crate::config::MinerConfig;
use crate::constants::{COINBASE_VOUT, SEQUENCE_FINAL};
use crate::error::Result;
use crate::preprocess::compute_txid;
use crate::segwit::witness_commitment_script;
use crate::serialization::serialize_extended;
use crate::types::*;
use tracing::debug;

/// A built coinbase: structured record, broadcast bytes and display-order txid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coinbase {
    pub transaction: Transaction,
    pub raw: ByteString,
    pub txid: Hash,
}

impl Coinbase {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }

    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }
}

/// Build the coinbase for a block whose witness commitment is `witness_commitment`
pub fn build_coinbase(config: &MinerConfig, witness_commitment: &Hash) -> Result<Coinbase> {
    let reserved_value = config.witness_reserved_value()?;

    let coinbase_input = TransactionInput {
        txid: [0u8; 32],
        vout: COINBASE_VOUT,
        script_sig: hex::decode(&config.coinbase_script_sig)?,
        sequence: SEQUENCE_FINAL,
        prevout: None,
        witness: Some(vec![reserved_value.to_vec()]),
    };

    let reward_output = TransactionOutput {
        value: config.coinbase_reward,
        script_pubkey: hex::decode(&config.coinbase_reward_script)?,
    };

    let commitment_output = TransactionOutput {
        value: 0,
        script_pubkey: witness_commitment_script(witness_commitment),
    };

    let transaction = Transaction {
        version: 1,
        inputs: vec![coinbase_input],
        outputs: vec![reward_output, commitment_output],
        lock_time: 0,
        fee: None,
    };

    let raw = serialize_extended(&transaction);
    let txid = compute_txid(&transaction);

    debug!(
        txid = %hex::encode(txid),
        commitment = %hex::encode(witness_commitment),
        "built coinbase"
    );

    Ok(Coinbase { transaction, raw, txid })
}

/// Coinbase: exactly one input spending the null outpoint
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.len() == 1 && tx.inputs[0].txid == [0u8; 32] && tx.inputs[0].vout == COINBASE_VOUT
}

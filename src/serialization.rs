//! Transaction wire format serialization
//!
//! Two layouts are produced, both used as hash preimages:
//! - legacy: the txid preimage, never carries witness data
//! - witness: the wtxid preimage, marker/flag + witness stacks when the
//!   transaction has a segwit spend, byte-identical to legacy otherwise

use crate::codec::{encode_varint, reverse_bytes};
use crate::types::*;

/// Segwit marker and flag bytes inserted after the version
pub const SEGWIT_MARKER_FLAG: [u8; 2] = [0x00, 0x01];

/// Serialize a transaction without witness data
///
/// Format:
/// - Version (4 bytes, little-endian)
/// - Input count (VarInt)
/// - For each input: reversed txid (32), vout (4), script length (VarInt), script, sequence (4)
/// - Output count (VarInt)
/// - For each output: value (8), script length (VarInt), script
/// - Lock time (4 bytes, little-endian)
pub fn serialize_legacy(tx: &Transaction) -> ByteString {
    serialize(tx, false)
}

/// Serialize a transaction for its wtxid
///
/// The marker/flag and witness section are present only when some input
/// has an empty script-sig.
pub fn serialize_witness(tx: &Transaction) -> ByteString {
    serialize(tx, has_witness_marker(tx))
}

/// Serialize a transaction with marker/flag and witness section regardless
/// of its script-sigs (broadcast form of a coinbase)
pub fn serialize_extended(tx: &Transaction) -> ByteString {
    serialize(tx, true)
}

/// Witness serialization inserts the marker iff an input spends with an empty script-sig
pub fn has_witness_marker(tx: &Transaction) -> bool {
    tx.spends_segwit()
}

fn serialize(tx: &Transaction, with_witness: bool) -> ByteString {
    let mut data = Vec::new();

    data.extend_from_slice(&tx.version.to_le_bytes());

    if with_witness {
        data.extend_from_slice(&SEGWIT_MARKER_FLAG);
    }

    data.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        write_outpoint(&mut data, input);
        write_script(&mut data, &input.script_sig);
        data.extend_from_slice(&input.sequence.to_le_bytes());
    }

    data.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        write_output(&mut data, output);
    }

    if with_witness {
        for input in &tx.inputs {
            // Inputs without a witness still contribute an empty stack
            let stack = input.witness.as_deref().unwrap_or(&[]);
            data.extend_from_slice(&encode_varint(stack.len() as u64));
            for item in stack {
                write_script(&mut data, item);
            }
        }
    }

    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data
}

/// Reversed previous txid followed by the output index
pub(crate) fn write_outpoint(data: &mut ByteString, input: &TransactionInput) {
    data.extend_from_slice(&reverse_bytes(&input.txid));
    data.extend_from_slice(&input.vout.to_le_bytes());
}

/// Value followed by the length-prefixed locking script
pub(crate) fn write_output(data: &mut ByteString, output: &TransactionOutput) {
    data.extend_from_slice(&output.value.to_le_bytes());
    write_script(data, &output.script_pubkey);
}

/// Length-prefixed byte string
pub(crate) fn write_script(data: &mut ByteString, script: &[u8]) {
    data.extend_from_slice(&encode_varint(script.len() as u64));
    data.extend_from_slice(script);
}

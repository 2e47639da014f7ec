//! Signature hash preimages
//!
//! Legacy: the transaction with the signed input's script-sig replaced by the
//! script code and all others emptied, followed by the 4-byte sighash type.
//! Segwit v0 (BIP143): version, hashPrevouts, hashSequence, outpoint, script
//! code, amount, sequence, hashOutputs, locktime, sighash type.

use crate::codec::hash256;
use crate::serialization::{serialize_legacy, write_outpoint, write_output, write_script};
use crate::types::*;

/// Legacy preimage for input `input_index`
pub fn legacy_preimage(tx: &Transaction, input_index: usize, script_code: &[u8], sighash_type: u32) -> ByteString {
    let mut signing_tx = tx.clone();
    for (i, input) in signing_tx.inputs.iter_mut().enumerate() {
        input.script_sig = if i == input_index { script_code.to_vec() } else { Vec::new() };
    }

    let mut preimage = serialize_legacy(&signing_tx);
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    preimage
}

/// Segwit v0 preimage for input `input_index`
///
/// Returns None when the index is out of range.
pub fn segwit_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    sighash_type: u32,
) -> Option<ByteString> {
    let input = tx.inputs.get(input_index)?;

    let mut prevouts = Vec::new();
    let mut sequences = Vec::new();
    for i in &tx.inputs {
        write_outpoint(&mut prevouts, i);
        sequences.extend_from_slice(&i.sequence.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for o in &tx.outputs {
        write_output(&mut outputs, o);
    }

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash256(&prevouts));
    preimage.extend_from_slice(&hash256(&sequences));
    write_outpoint(&mut preimage, input);
    write_script(&mut preimage, script_code);
    preimage.extend_from_slice(&amount.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash256(&outputs));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Some(preimage)
}

/// hash256 of the legacy preimage
pub fn legacy_sighash(tx: &Transaction, input_index: usize, script_code: &[u8], sighash_type: u32) -> Hash {
    hash256(&legacy_preimage(tx, input_index, script_code, sighash_type))
}

/// hash256 of the segwit v0 preimage
pub fn segwit_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    sighash_type: u32,
) -> Option<Hash> {
    segwit_preimage(tx, input_index, script_code, amount, sighash_type).map(|p| hash256(&p))
}

/// P2PKH-shaped script code for a 20-byte public key hash
pub fn p2pkh_script_code(pubkey_hash: &[u8]) -> ByteString {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

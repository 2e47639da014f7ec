//! Error paths across the public API

use consensus_miner::coinbase::build_coinbase;
use consensus_miner::codec::{decode_varint, reverse_hex};
use consensus_miner::mining::search_nonce;
use consensus_miner::pow::{deserialize_header, expand_bits, validate_header, validate_header_hex, Target};
use consensus_miner::preprocess::{calculate_fee, preprocess};
use consensus_miner::*;

fn header_at(nonce: u32) -> BlockHeader {
    BlockHeader {
        version: 4,
        prev_block_hash: [0u8; 32],
        merkle_root: [0x11u8; 32],
        timestamp: 1_700_000_000,
        bits: 0x1f00ffff,
        nonce,
    }
}

#[test]
fn test_malformed_header_lengths() {
    for len in [0usize, 79, 81, 160] {
        let bytes = vec![0u8; len];
        assert!(matches!(
            validate_header(&bytes, &Target::MAX),
            Err(ConsensusError::MalformedHeader(n)) if n == len
        ));
        assert!(matches!(deserialize_header(&bytes), Err(ConsensusError::MalformedHeader(_))));
    }
}

#[test]
fn test_target_not_met_message() {
    let err = validate_header(&[0u8; 80], &Target([0u8; 32])).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("does not meet target"));
    assert!(message.contains(&"0".repeat(64)));
}

#[test]
fn test_header_hex_errors() {
    assert!(matches!(
        validate_header_hex("zz", &"f".repeat(64)),
        Err(ConsensusError::Serialization(_))
    ));
    assert!(matches!(
        validate_header_hex(&"00".repeat(80), "xyz"),
        Err(ConsensusError::InvalidTarget(_))
    ));
}

#[test]
fn test_nonce_exhaustion_does_not_wrap() {
    let mut header = header_at(u32::MAX);
    let err = search_nonce(&mut header, &Target([0u8; 32])).unwrap_err();
    assert!(matches!(err, ConsensusError::NonceSpaceExhausted));
    assert_eq!(header.nonce, u32::MAX);
}

#[test]
fn test_empty_transaction_set() {
    let mut assembler = BlockAssembler::new(MinerConfig::default()).unwrap();
    assert!(matches!(assembler.assemble(vec![]), Err(ConsensusError::EmptyTransactionSet)));
}

#[test]
fn test_block_weight_exceeded_message() {
    let err = ConsensusError::BlockWeightExceeded { weight: 4_000_001, max: 4_000_000 };
    assert_eq!(err.to_string(), "Block weight 4000001 exceeds maximum 4000000");
}

#[test]
fn test_missing_prevout_is_malformed() {
    let tx = Transaction {
        version: 1,
        inputs: vec![TransactionInput {
            txid: [1u8; 32],
            vout: 0,
            script_sig: vec![0x51],
            sequence: 0xffffffff,
            prevout: None,
            witness: None,
        }],
        outputs: vec![TransactionOutput { value: 1, script_pubkey: vec![0x51] }],
        lock_time: 0,
        fee: None,
    };
    assert!(matches!(calculate_fee(&tx), Err(ConsensusError::MalformedTransaction(_))));
    assert!(matches!(preprocess(tx.clone()), Err(ConsensusError::MalformedTransaction(_))));

    // A supplied fee skips the prevout lookup
    let with_fee = Transaction { fee: Some(10), ..tx };
    assert_eq!(preprocess(with_fee).unwrap().fee, 10);
}

#[test]
fn test_bad_config_values() {
    let short_reserved = MinerConfig {
        witness_reserved_value: "00".to_string(),
        ..MinerConfig::default()
    };
    assert!(matches!(
        build_coinbase(&short_reserved, &[0u8; 32]),
        Err(ConsensusError::Serialization(_))
    ));

    assert!(matches!(
        MinerConfig::from_json("{\"bits\": \"high\"}"),
        Err(ConsensusError::Serialization(_))
    ));
}

#[test]
fn test_codec_errors() {
    assert!(decode_varint(&[]).is_err());
    assert!(decode_varint(&[0xfd, 0x01]).is_err());
    assert!(decode_varint(&[0xff, 0, 0, 0]).is_err());
    assert!(reverse_hex("abc").is_err());
    assert!(hash_from_hex("abcd").is_err());
}

#[test]
fn test_expand_bits_rejects_negative() {
    assert!(matches!(expand_bits(0x04923456), Err(ConsensusError::InvalidTarget(_))));
}

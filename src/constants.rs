//! Protocol constants used by block assembly and script validation

/// Maximum block weight
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

/// Weight assigned to every transaction (flat placeholder, not BIP141 weight)
pub const TX_WEIGHT_PLACEHOLDER: u64 = 1;

/// Block header size in bytes
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Block version written into assembled headers
pub const BLOCK_VERSION: i32 = 4;

/// Compact difficulty bits written into assembled headers
pub const DIFFICULTY_BITS: u32 = 0x1f00ffff;

/// Difficulty target the header hash must not exceed
pub const DIFFICULTY_TARGET: &str =
    "0000ffff00000000000000000000000000000000000000000000000000000000";

/// Witness reserved value placed in the coinbase witness
pub const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];

/// Witness commitment output prefix: OP_RETURN, push 36, commitment header
pub const WITNESS_COMMITMENT_PREFIX: [u8; 6] = [0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xed];

/// Default coinbase script-sig (height push and pool tag)
pub const COINBASE_SCRIPT_SIG: &str =
    "03233708184d696e656420627920416e74506f6f6c373946205b8160a4256c0000946e0100";

/// Default coinbase reward script (P2PKH)
pub const COINBASE_REWARD_SCRIPT: &str = "76a914edf10a7fac6b32e24daa5305c723f3de58db1bc888ac";

/// Default coinbase reward in satoshis
pub const COINBASE_REWARD: u64 = 1_250_006_517;

/// Coinbase input previous-output index
pub const COINBASE_VOUT: u32 = 0xffffffff;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// The only signature hash type accepted by OP_CHECKSIG
pub const SIGHASH_ALL: u8 = 0x01;

/// Maximum stack size during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum public keys in an OP_CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

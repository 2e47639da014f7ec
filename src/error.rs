//! Error types for block assembly and mining

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Malformed header: expected 80 bytes, got {0}")]
    MalformedHeader(usize),

    #[error("Block hash {hash} does not meet target {target}")]
    TargetNotMet { hash: String, target: String },

    #[error("Nonce space exhausted without meeting the target")]
    NonceSpaceExhausted,

    #[error("No transactions available to build a block")]
    EmptyTransactionSet,

    #[error("Block weight {weight} exceeds maximum {max}")]
    BlockWeightExceeded { weight: u64, max: u64 },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Invalid difficulty target: {0}")]
    InvalidTarget(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<hex::FromHexError> for ConsensusError {
    fn from(err: hex::FromHexError) -> Self {
        ConsensusError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

//! Configuration for block assembly
//!
//! Every field has a default matching the constants in [`crate::constants`], so a
//! partial JSON document only needs to name the values it overrides.

use crate::constants::*;
use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};

/// Block assembly and mining parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Header version field
    #[serde(default = "default_block_version")]
    pub block_version: i32,

    /// Compact difficulty bits written into the header
    #[serde(default = "default_bits")]
    pub bits: u32,

    /// Big-endian hex threshold the header hash must not exceed
    #[serde(default = "default_difficulty_target")]
    pub difficulty_target: String,

    /// Coinbase input script-sig (hex)
    #[serde(default = "default_coinbase_script_sig")]
    pub coinbase_script_sig: String,

    /// Coinbase reward output value in satoshis
    #[serde(default = "default_coinbase_reward")]
    pub coinbase_reward: u64,

    /// Coinbase reward output locking script (hex)
    #[serde(default = "default_coinbase_reward_script")]
    pub coinbase_reward_script: String,

    /// Witness reserved value (hex, 32 bytes)
    #[serde(default = "default_witness_reserved_value")]
    pub witness_reserved_value: String,

    /// Post-assembly block weight limit
    #[serde(default = "default_max_block_weight")]
    pub max_block_weight: u64,

    /// Fixed header timestamp; the current UNIX time is used when absent
    #[serde(default)]
    pub timestamp: Option<u32>,
}

fn default_block_version() -> i32 {
    BLOCK_VERSION
}

fn default_bits() -> u32 {
    DIFFICULTY_BITS
}

fn default_difficulty_target() -> String {
    DIFFICULTY_TARGET.to_string()
}

fn default_coinbase_script_sig() -> String {
    COINBASE_SCRIPT_SIG.to_string()
}

fn default_coinbase_reward() -> u64 {
    COINBASE_REWARD
}

fn default_coinbase_reward_script() -> String {
    COINBASE_REWARD_SCRIPT.to_string()
}

fn default_witness_reserved_value() -> String {
    hex::encode(WITNESS_RESERVED_VALUE)
}

fn default_max_block_weight() -> u64 {
    MAX_BLOCK_WEIGHT
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            block_version: default_block_version(),
            bits: default_bits(),
            difficulty_target: default_difficulty_target(),
            coinbase_script_sig: default_coinbase_script_sig(),
            coinbase_reward: default_coinbase_reward(),
            coinbase_reward_script: default_coinbase_reward_script(),
            witness_reserved_value: default_witness_reserved_value(),
            max_block_weight: default_max_block_weight(),
            timestamp: None,
        }
    }
}

impl MinerConfig {
    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }

    /// Decoded witness reserved value
    pub fn witness_reserved_value(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.witness_reserved_value)?;
        bytes.as_slice().try_into().map_err(|_| {
            ConsensusError::Serialization(format!(
                "witness reserved value must be 32 bytes, got {}",
                bytes.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = MinerConfig::default();
        assert_eq!(config.block_version, 4);
        assert_eq!(config.bits, 0x1f00ffff);
        assert_eq!(config.max_block_weight, 4_000_000);
        assert_eq!(config.witness_reserved_value().unwrap(), [0u8; 32]);
        assert!(config.timestamp.is_none());
    }

    #[test]
    fn test_from_json_partial() {
        let config = MinerConfig::from_json(r#"{"timestamp": 1700000000, "bits": 486604799}"#).unwrap();
        assert_eq!(config.timestamp, Some(1700000000));
        assert_eq!(config.bits, 0x1d00ffff);
        assert_eq!(config.difficulty_target, DIFFICULTY_TARGET);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(MinerConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_bad_reserved_value_length() {
        let config = MinerConfig {
            witness_reserved_value: "00".to_string(),
            ..MinerConfig::default()
        };
        assert!(config.witness_reserved_value().is_err());
    }
}

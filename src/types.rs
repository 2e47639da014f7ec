//! Core types for block assembly
//!
//! Transaction records deserialize straight from the mempool JSON layout
//! (`vin`/`vout`/`scriptsig`/`scriptpubkey`, hex-encoded byte fields).
//! Identifiers read from records (`txid` of an input) are kept in display
//! order; serializers reverse them where the wire format requires it.

use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Witness stack: ordered byte strings
pub type Witness = Vec<ByteString>;

/// The output an input spends, resolved ahead of time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prevout {
    #[serde(with = "hex_bytes")]
    pub scriptpubkey: ByteString,
    pub value: u64,
}

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Previous transaction id, display order
    #[serde(with = "hex_hash")]
    pub txid: Hash,
    pub vout: u32,
    #[serde(rename = "scriptsig", with = "hex_bytes")]
    pub script_sig: ByteString,
    pub sequence: u32,
    #[serde(default)]
    pub prevout: Option<Prevout>,
    #[serde(default, with = "hex_witness", skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    #[serde(rename = "scriptpubkey", with = "hex_bytes")]
    pub script_pubkey: ByteString,
}

/// Transaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    #[serde(rename = "vin")]
    pub inputs: Vec<TransactionInput>,
    #[serde(rename = "vout")]
    pub outputs: Vec<TransactionOutput>,
    #[serde(rename = "locktime")]
    pub lock_time: u32,
    /// Fee supplied by the record source, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<i64>,
}

impl Transaction {
    /// Parse a transaction record from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConsensusError::MalformedTransaction(e.to_string()))
    }

    /// Render the record back to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }

    /// True if any input spends with an empty script-sig (segwit spend)
    pub fn spends_segwit(&self) -> bool {
        self.inputs.iter().any(|input| input.script_sig.is_empty())
    }
}

/// Transaction with its derived identifiers and fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub transaction: Transaction,
    /// Display order (byte-reversed hash256 of the legacy serialization)
    pub txid: Hash,
    /// Display order (byte-reversed hash256 of the witness serialization)
    pub wtxid: Hash,
    pub fee: i64,
    pub weight: u64,
}

impl PreparedTransaction {
    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }

    pub fn wtxid_hex(&self) -> String {
        hex::encode(self.wtxid)
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

/// Block Header: version, previous hash, merkle root, time, bits, nonce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    /// Internal byte order, written verbatim
    pub prev_block_hash: Hash,
    /// Internal byte order, written verbatim
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

/// Parse a display-order hex identifier into a hash
pub fn hash_from_hex(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ConsensusError::Serialization(format!("expected 32-byte hash, got {} bytes", bytes.len())))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

mod hex_hash {
    use super::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::hash_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

mod hex_witness {
    use super::Witness;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(witness: &Option<Witness>, serializer: S) -> Result<S::Ok, S::Error> {
        match witness {
            Some(items) => serializer.collect_seq(items.iter().map(hex::encode)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Witness>, D::Error> {
        let items: Option<Vec<String>> = Option::deserialize(deserializer)?;
        items
            .map(|items| {
                items
                    .iter()
                    .map(|item| hex::decode(item).map_err(serde::de::Error::custom))
                    .collect()
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "version": 2,
        "locktime": 0,
        "vin": [{
            "txid": "fb7fe37919a55dfa45a062f88bd3c7412b54de759115cb58c3b9b46ac5f7c925",
            "vout": 1,
            "prevout": {
                "scriptpubkey": "76a914286eb663201959fb12eff504329080e4c56ae28788ac",
                "scriptpubkey_type": "p2pkh",
                "value": 100000
            },
            "scriptsig": "",
            "scriptsig_asm": "",
            "witness": ["3044", "02ab"],
            "is_coinbase": false,
            "sequence": 4294967293
        }],
        "vout": [{
            "scriptpubkey": "0014ad4cc1cc859c57477bf90d0f944360d90a3998bf",
            "value": 99000
        }]
    }"#;

    #[test]
    fn test_parse_record() {
        let tx = Transaction::from_json(RECORD).unwrap();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].txid[0], 0xfb);
        assert_eq!(tx.inputs[0].sequence, 0xfffffffd);
        assert_eq!(tx.inputs[0].prevout.as_ref().unwrap().value, 100000);
        assert_eq!(tx.inputs[0].witness, Some(vec![vec![0x30, 0x44], vec![0x02, 0xab]]));
        assert_eq!(tx.outputs[0].script_pubkey.len(), 22);
        assert!(tx.fee.is_none());
        assert!(tx.spends_segwit());
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let result = Transaction::from_json(r#"{"version": 1, "vin": [], "locktime": 0}"#);
        assert!(matches!(result, Err(ConsensusError::MalformedTransaction(_))));
    }

    #[test]
    fn test_bad_hex_is_malformed() {
        let json = RECORD.replace("\"scriptsig\": \"\"", "\"scriptsig\": \"zz\"");
        assert!(matches!(Transaction::from_json(&json), Err(ConsensusError::MalformedTransaction(_))));
    }

    #[test]
    fn test_json_roundtrip_preserves_record() {
        let tx = Transaction::from_json(RECORD).unwrap();
        let again = Transaction::from_json(&tx.to_json().unwrap()).unwrap();
        assert_eq!(tx, again);
    }

    #[test]
    fn test_hash_from_hex_wrong_length() {
        assert!(hash_from_hex("abcd").is_err());
        assert!(hash_from_hex(&"00".repeat(32)).is_ok());
    }
}

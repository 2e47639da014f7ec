//! # Consensus-Miner
//!
//! Assembles and mines a single segwit block from a set of transaction records.
//!
//! Transaction records are preprocessed into txid/wtxid/fee form, filtered
//! into a block, committed to by a coinbase carrying the witness commitment,
//! and rooted in an 80-byte header whose nonce is searched until the header
//! hash meets the difficulty target. Spending authorization of individual
//! inputs (P2PKH, P2SH, P2WPKH) is checked by a separate script interpreter.
//!
//! ## Design Principles
//!
//! 1. **Consensus byte layouts**: every hash preimage is the exact Bitcoin serialization
//! 2. **Exact Version Pinning**: all consensus-critical dependencies pinned to exact versions
//! 3. **Injected verification**: signature checks go through [`script::SignatureVerifier`]
//! 4. **Fail closed**: malformed scripts never validate
//!
//! ## Usage
//!
//! ```rust
//! use consensus_miner::{BlockMiner, MinerConfig};
//! use consensus_miner::types::*;
//!
//! let config = MinerConfig {
//!     difficulty_target: "f".repeat(64),
//!     timestamp: Some(1_700_000_000),
//!     ..MinerConfig::default()
//! };
//! let mut miner = BlockMiner::new(config).unwrap();
//!
//! let tx = Transaction {
//!     version: 2,
//!     inputs: vec![TransactionInput {
//!         txid: [1u8; 32],
//!         vout: 0,
//!         script_sig: vec![0x51],
//!         sequence: 0xffffffff,
//!         prevout: Some(Prevout { scriptpubkey: vec![0x51], value: 10_000 }),
//!         witness: None,
//!     }],
//!     outputs: vec![TransactionOutput { value: 9_000, script_pubkey: vec![0x51] }],
//!     lock_time: 0,
//!     fee: None,
//! };
//!
//! let block = miner.mine_block(vec![tx]).unwrap();
//! assert_eq!(block.to_output_lines().len(), 4);
//! ```

pub mod types;
pub mod constants;
pub mod config;
pub mod error;
pub mod codec;
pub mod serialization;
pub mod preprocess;
pub mod mempool;
pub mod merkle;
pub mod segwit;
pub mod coinbase;
pub mod pow;
pub mod sighash;
pub mod script;
pub mod mining;

// Re-export commonly used types
pub use types::*;
pub use config::MinerConfig;
pub use error::{ConsensusError, Result};
pub use mining::{AssemblyState, BlockAssembler, BlockTemplate, MinedBlock};
pub use preprocess::PreprocessStats;
pub use script::{Secp256k1Verifier, SignatureVerifier};

/// Main block mining entry point
///
/// Wraps a [`BlockAssembler`] and the preprocessing and script validation
/// steps that feed it.
pub struct BlockMiner {
    assembler: BlockAssembler,
    last_stats: PreprocessStats,
}

impl BlockMiner {
    /// Create a miner; fails if the configured difficulty target does not parse
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_miner::{BlockMiner, MinerConfig};
    ///
    /// let miner = BlockMiner::new(MinerConfig::default()).unwrap();
    /// assert_eq!(miner.config().block_version, 4);
    /// ```
    pub fn new(config: MinerConfig) -> Result<Self> {
        Ok(Self {
            assembler: BlockAssembler::new(config)?,
            last_stats: PreprocessStats::default(),
        })
    }

    pub fn config(&self) -> &MinerConfig {
        self.assembler.config()
    }

    pub fn state(&self) -> AssemblyState {
        self.assembler.state()
    }

    /// Spent-output statistics from the most recent [`prepare`](Self::prepare)
    pub fn last_stats(&self) -> &PreprocessStats {
        &self.last_stats
    }

    /// Derive txid, wtxid and fee for each record
    ///
    /// A record missing required data fails the whole batch with
    /// [`ConsensusError::MalformedTransaction`]; statistics are only updated
    /// on success.
    pub fn prepare(&mut self, transactions: Vec<Transaction>) -> Result<Vec<PreparedTransaction>> {
        let (prepared, stats) = preprocess::preprocess_all(transactions)?;
        self.last_stats = stats;
        Ok(prepared)
    }

    /// Check that every input of `tx` authorizes its spend
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_miner::{BlockMiner, MinerConfig, Secp256k1Verifier};
    /// use consensus_miner::types::*;
    ///
    /// let miner = BlockMiner::new(MinerConfig::default()).unwrap();
    /// let tx = Transaction {
    ///     version: 1,
    ///     inputs: vec![TransactionInput {
    ///         txid: [1u8; 32],
    ///         vout: 0,
    ///         script_sig: vec![],
    ///         sequence: 0xffffffff,
    ///         prevout: Some(Prevout { scriptpubkey: vec![0x6a], value: 1 }),
    ///         witness: None,
    ///     }],
    ///     outputs: vec![],
    ///     lock_time: 0,
    ///     fee: None,
    /// };
    ///
    /// // OP_RETURN outputs are never spendable
    /// assert!(!miner.verify_scripts(&tx, &Secp256k1Verifier::new()));
    /// ```
    pub fn verify_scripts<V: SignatureVerifier + ?Sized>(&self, tx: &Transaction, verifier: &V) -> bool {
        script::validate_transaction_scripts(tx, verifier)
    }

    /// Build the coinbase and header for `transactions` without mining
    pub fn build_template(&mut self, transactions: Vec<Transaction>) -> Result<BlockTemplate> {
        let prepared = self.prepare(transactions)?;
        self.assembler.assemble(prepared)
    }

    /// Preprocess, assemble and mine
    pub fn mine_block(&mut self, transactions: Vec<Transaction>) -> Result<MinedBlock> {
        let prepared = self.prepare(transactions)?;
        self.assembler.assemble_and_mine(prepared)
    }

    /// As [`mine_block`](Self::mine_block), first dropping transactions whose
    /// scripts do not validate
    pub fn mine_verified_block<V: SignatureVerifier + ?Sized>(
        &mut self,
        transactions: Vec<Transaction>,
        verifier: &V,
    ) -> Result<MinedBlock> {
        let verified: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| {
                let valid = script::validate_transaction_scripts(tx, verifier);
                if !valid {
                    tracing::debug!(txid = %hex::encode(preprocess::compute_txid(tx)), "script validation failed");
                }
                valid
            })
            .collect();
        self.mine_block(verified)
    }

    /// Validate a finished header against the configured target
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_miner::{BlockMiner, MinerConfig};
    ///
    /// let config = MinerConfig { difficulty_target: "f".repeat(64), ..MinerConfig::default() };
    /// let miner = BlockMiner::new(config).unwrap();
    /// assert!(miner.validate_header(&[0u8; 80]).is_ok());
    /// assert!(miner.validate_header(&[0u8; 79]).is_err());
    /// ```
    pub fn validate_header(&self, header_bytes: &[u8]) -> Result<()> {
        pow::validate_header(header_bytes, self.assembler.target())
    }
}

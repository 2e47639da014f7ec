//! Block assembly and nonce search
//!
//! `Building → Searching → Found | Exhausted`
//!
//! Building commits to the selected transactions' wtxids in the coinbase,
//! roots the header at `[coinbase txid] ‖ [txid …]` and starts at nonce 0.
//! Searching increments the nonce until the reversed header hash is at most
//! the target. The nonce never wraps: reaching 0xFFFFFFFF without success is
//! [`ConsensusError::NonceSpaceExhausted`].

use crate::coinbase::{build_coinbase, Coinbase};
use crate::config::MinerConfig;
use crate::error::{ConsensusError, Result};
use crate::mempool::select_transactions;
use crate::merkle::merkle_root;
use crate::pow::{check_proof_of_work, header_hash_value, serialize_header, validate_header, Target};
use crate::segwit::calculate_witness_commitment;
use crate::types::*;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace, warn};

const PROGRESS_INTERVAL: u32 = 1 << 20;

/// Assembly progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Building,
    Searching,
    Found,
    Exhausted,
    /// The searched header failed its final proof-of-work check
    Rejected,
}

/// A block ready for the nonce search
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub header: BlockHeader,
    pub coinbase: Coinbase,
    /// Selected transactions in header-Merkle order (coinbase excluded)
    pub transactions: Vec<PreparedTransaction>,
    pub witness_commitment: Hash,
    pub total_weight: u64,
    pub total_fee: i64,
}

impl BlockTemplate {
    /// Txids feeding the header Merkle root, coinbase first
    pub fn txids(&self) -> Vec<Hash> {
        std::iter::once(self.coinbase.txid)
            .chain(self.transactions.iter().map(|tx| tx.txid))
            .collect()
    }
}

/// A block whose header meets the target
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub header: BlockHeader,
    pub header_bytes: [u8; 80],
    pub coinbase: Coinbase,
    pub transactions: Vec<PreparedTransaction>,
}

impl MinedBlock {
    pub fn header_hex(&self) -> String {
        hex::encode(self.header_bytes)
    }

    /// Display-order block hash
    pub fn block_hash_hex(&self) -> String {
        hex::encode(header_hash_value(&self.header_bytes))
    }

    /// Header hex, coinbase hex, coinbase txid, then one txid per transaction
    pub fn to_output_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.transactions.len() + 3);
        lines.push(self.header_hex());
        lines.push(self.coinbase.raw_hex());
        lines.push(self.coinbase.txid_hex());
        lines.extend(self.transactions.iter().map(|tx| tx.txid_hex()));
        lines
    }

    /// Newline-joined [`to_output_lines`](Self::to_output_lines)
    pub fn to_output_string(&self) -> String {
        let mut out = self.to_output_lines().join("\n");
        out.push('\n');
        out
    }
}

/// Total weight and fee of the selected transactions
///
/// Fails with [`ConsensusError::BlockWeightExceeded`] above `max_weight`.
pub fn calculate_block_weight_and_fee(transactions: &[PreparedTransaction], max_weight: u64) -> Result<(u64, i64)> {
    let weight: u64 = transactions.iter().map(|tx| tx.weight).sum();
    let fee: i64 = transactions.iter().map(|tx| tx.fee).sum();

    if weight > max_weight {
        return Err(ConsensusError::BlockWeightExceeded { weight, max: max_weight });
    }
    Ok((weight, fee))
}

/// Increment `header.nonce` from its current value until the header meets `target`
///
/// On success the header holds the winning nonce, which is also returned.
pub fn search_nonce(header: &mut BlockHeader, target: &Target) -> Result<u32> {
    loop {
        let bytes = serialize_header(header);
        if check_proof_of_work(&bytes, target) {
            return Ok(header.nonce);
        }
        if header.nonce == u32::MAX {
            return Err(ConsensusError::NonceSpaceExhausted);
        }
        header.nonce += 1;
        if header.nonce % PROGRESS_INTERVAL == 0 {
            trace!(nonce = header.nonce, "nonce search progress");
        }
    }
}

fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Builds and mines one block under a [`MinerConfig`]
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    config: MinerConfig,
    target: Target,
    state: AssemblyState,
}

impl BlockAssembler {
    /// Fails if the configured difficulty target does not parse
    pub fn new(config: MinerConfig) -> Result<Self> {
        let target = Target::from_hex(&config.difficulty_target)?;
        Ok(Self {
            config,
            target,
            state: AssemblyState::Building,
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Building: select candidates, build the coinbase and the initial header
    pub fn assemble(&mut self, candidates: Vec<PreparedTransaction>) -> Result<BlockTemplate> {
        self.state = AssemblyState::Building;

        if candidates.is_empty() {
            return Err(ConsensusError::EmptyTransactionSet);
        }
        let offered = candidates.len();
        let transactions = select_transactions(candidates);
        if transactions.is_empty() {
            return Err(ConsensusError::EmptyTransactionSet);
        }

        let (total_weight, total_fee) = calculate_block_weight_and_fee(&transactions, self.config.max_block_weight)?;

        let reserved_value = self.config.witness_reserved_value()?;
        let witness_commitment = calculate_witness_commitment(&transactions, &reserved_value);
        let coinbase = build_coinbase(&self.config, &witness_commitment)?;

        let mut txids = Vec::with_capacity(transactions.len() + 1);
        txids.push(coinbase.txid);
        txids.extend(transactions.iter().map(|tx| tx.txid));
        let merkle_root = merkle_root(&txids).ok_or(ConsensusError::EmptyTransactionSet)?;

        let header = BlockHeader {
            version: self.config.block_version,
            prev_block_hash: [0u8; 32],
            merkle_root,
            timestamp: self.config.timestamp.unwrap_or_else(current_timestamp),
            bits: self.config.bits,
            nonce: 0,
        };

        info!(
            offered,
            selected = transactions.len(),
            total_fee,
            total_weight,
            merkle_root = %hex::encode(merkle_root),
            "block template assembled"
        );

        Ok(BlockTemplate {
            header,
            coinbase,
            transactions,
            witness_commitment,
            total_weight,
            total_fee,
        })
    }

    /// Searching → Found | Exhausted | Rejected
    ///
    /// The found header is validated again before it is returned. A failure
    /// there is an internal consistency error and leaves the assembler in
    /// [`AssemblyState::Rejected`].
    pub fn mine(&mut self, template: BlockTemplate) -> Result<MinedBlock> {
        self.state = AssemblyState::Searching;
        let mut header = template.header.clone();
        debug!(difficulty = %self.target, start_nonce = header.nonce, "searching nonce space");

        if let Err(e) = search_nonce(&mut header, &self.target) {
            self.state = AssemblyState::Exhausted;
            return Err(e);
        }

        self.finish(header, template)
    }

    /// Searching → Found | Rejected
    fn finish(&mut self, header: BlockHeader, template: BlockTemplate) -> Result<MinedBlock> {
        let header_bytes = serialize_header(&header);
        if let Err(e) = validate_header(&header_bytes, &self.target) {
            warn!(nonce = header.nonce, error = %e, "searched header failed validation");
            self.state = AssemblyState::Rejected;
            return Err(e);
        }
        self.state = AssemblyState::Found;

        info!(
            nonce = header.nonce,
            hash = %hex::encode(header_hash_value(&header_bytes)),
            "block mined"
        );

        Ok(MinedBlock {
            header,
            header_bytes,
            coinbase: template.coinbase,
            transactions: template.transactions,
        })
    }

    /// Assemble then mine
    pub fn assemble_and_mine(&mut self, candidates: Vec<PreparedTransaction>) -> Result<MinedBlock> {
        let template = self.assemble(candidates)?;
        self.mine(template)
    }
}

// Block data structures

use crate::core::{Hash256, sha256, Transaction};
use crate::core::serialize::{CanonicalEncode, write_varint, write_u64};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Fixed genesis timestamp shared by every node (ms since epoch)
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000_000;

/// Block - an ordered batch of transactions sealed by proof-of-work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain, genesis = 0
    pub index: u64,
    /// Creation time, milliseconds since epoch
    pub timestamp: u64,
    /// Transactions in this block
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block
    pub previous_hash: Hash256,
    /// Nonce for proof-of-work
    pub nonce: u64,
    /// Digest of (previous_hash, timestamp, transactions, nonce)
    pub hash: Hash256,
}

impl Block {
    /// Unsealed candidate; `hash` reflects nonce 0 until mined
    pub fn candidate(
        index: u64,
        previous_hash: Hash256,
        timestamp: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: Hash256::zero(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The genesis block, identical on every node
    pub fn genesis() -> Self {
        Self::candidate(0, Hash256::zero(), GENESIS_TIMESTAMP, Vec::new())
    }

    /// Recompute the digest from the block's own fields
    pub fn calculate_hash(&self) -> Hash256 {
        Self::hash_with_nonce(&self.header_prefix(), self.nonce)
    }

    /// Bytes covering everything except the nonce; the miner reuses them
    /// across attempts
    pub fn header_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_all(self.previous_hash.as_bytes()).unwrap();
        write_u64(&mut buf, self.timestamp).unwrap();
        write_varint(&mut buf, self.transactions.len() as u64).unwrap();
        for tx in &self.transactions {
            tx.encode_to(&mut buf).unwrap();
        }
        buf
    }

    pub fn hash_with_nonce(prefix: &[u8], nonce: u64) -> Hash256 {
        let mut buf = Vec::with_capacity(prefix.len() + 8);
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&nonce.to_le_bytes());
        sha256(&buf)
    }

    /// Stored hash equals the recomputed one
    pub fn is_self_consistent(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == Hash256::zero()
    }

    /// Transactions other than mint rewards/funding
    pub fn transfer_count(&self) -> usize {
        self.transactions.iter().filter(|tx| !tx.is_mint()).count()
    }
}

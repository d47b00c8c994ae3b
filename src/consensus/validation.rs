// Transaction and block validation

use crate::core::{Block, Transaction, Verifier};
use crate::consensus::pow::{Difficulty, Miner};

/// Malformed input; rejected locally and never relayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `from` or `to` is empty
    MissingAddress,
    /// Sender and recipient are the same address
    SelfTransfer,
    /// Amount must be positive
    ZeroAmount,
    /// Non-mint transaction without a signature
    MissingSignature,
    /// Signature does not verify against the sender
    InvalidSignature,
    /// Gossip record could not be parsed
    MalformedMessage(String),
    /// Gossip record carried a type tag outside the protocol
    UnknownMessageType(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationError::MissingAddress => write!(f, "Transaction must include from and to addresses"),
            ValidationError::SelfTransfer => write!(f, "Sender and recipient are the same address"),
            ValidationError::ZeroAmount => write!(f, "Amount must be positive"),
            ValidationError::MissingSignature => write!(f, "Transaction must be signed"),
            ValidationError::InvalidSignature => write!(f, "Invalid signature"),
            ValidationError::MalformedMessage(e) => write!(f, "Malformed message: {}", e),
            ValidationError::UnknownMessageType(t) => write!(f, "Unknown message type: {}", t),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Externally supplied block or chain failed hash, link or PoW checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// Chain is empty
    EmptyChain,
    /// First block differs from the canonical genesis
    GenesisMismatch,
    /// Stored hash differs from the recomputed one
    HashMismatch { index: u64 },
    /// previous_hash does not point at the preceding block
    BrokenLink { index: u64 },
    /// Block hash does not meet the difficulty
    InsufficientWork { index: u64 },
    /// Index is not one past the preceding block
    IndexMismatch { expected: u64, found: u64 },
}

impl std::fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConsensusError::EmptyChain => write!(f, "Chain is empty"),
            ConsensusError::GenesisMismatch => write!(f, "Genesis block mismatch"),
            ConsensusError::HashMismatch { index } => write!(f, "Block {} hash mismatch", index),
            ConsensusError::BrokenLink { index } => write!(f, "Block {} does not link to its predecessor", index),
            ConsensusError::InsufficientWork { index } => write!(f, "Block {} has invalid proof of work", index),
            ConsensusError::IndexMismatch { expected, found } => {
                write!(f, "Block index mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for ConsensusError {}

/// Block validator
#[derive(Debug, Clone)]
pub struct BlockValidator {
    /// PoW miner for verification
    miner: Miner,
}

impl BlockValidator {
    /// Create a new block validator with fixed difficulty
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            miner: Miner::new(difficulty),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.miner.difficulty
    }

    /// Self-consistency and PoW of a single non-genesis block
    pub fn validate_block(&self, block: &Block) -> Result<(), ConsensusError> {
        if !block.is_self_consistent() {
            return Err(ConsensusError::HashMismatch { index: block.index });
        }
        if !self.miner.verify(block) {
            return Err(ConsensusError::InsufficientWork { index: block.index });
        }
        Ok(())
    }

    /// `block` as the direct successor of `previous`
    pub fn validate_successor(&self, previous: &Block, block: &Block) -> Result<(), ConsensusError> {
        if block.previous_hash != previous.hash {
            return Err(ConsensusError::BrokenLink { index: block.index });
        }
        if block.index != previous.index + 1 {
            return Err(ConsensusError::IndexMismatch {
                expected: previous.index + 1,
                found: block.index,
            });
        }
        self.validate_block(block)
    }

    /// Full chain from genesis
    pub fn validate_chain(&self, chain: &[Block]) -> Result<(), ConsensusError> {
        let first = chain.first().ok_or(ConsensusError::EmptyChain)?;
        if *first != Block::genesis() {
            return Err(ConsensusError::GenesisMismatch);
        }

        for pair in chain.windows(2) {
            self.validate_successor(&pair[0], &pair[1])?;
        }

        Ok(())
    }
}

/// Transaction validator (for mempool admission)
pub struct TransactionValidator;

impl TransactionValidator {
    /// Shape checks that need no chain state
    pub fn validate_shape(tx: &Transaction) -> Result<(), ValidationError> {
        if tx.from.is_empty() || tx.to.is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        if tx.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        if !tx.is_mint() && tx.from == tx.to {
            return Err(ValidationError::SelfTransfer);
        }
        Ok(())
    }

    /// Shape plus signature; mint transactions are exempt from the latter
    pub fn validate_for_mempool(tx: &Transaction, verifier: &dyn Verifier) -> Result<(), ValidationError> {
        Self::validate_shape(tx)?;

        if tx.is_mint() {
            return Ok(());
        }
        if tx.signature.is_empty() {
            return Err(ValidationError::MissingSignature);
        }
        if !tx.verify_signature(verifier) {
            return Err(ValidationError::InvalidSignature);
        }
        Ok(())
    }
}

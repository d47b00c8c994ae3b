// Crate-level error type

use crate::consensus::{ConsensusError, ValidationError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed transaction, block or message
    Validation(ValidationError),
    /// Hash, link or PoW mismatch on external data
    Consensus(ConsensusError),
    /// Sender's confirmed balance cannot cover the amount
    InsufficientFunds { available: i128, requested: u64 },
    /// Operation needs at least one live peer
    NoPeers,
    /// Connection-level failure, isolated to one peer
    PeerIo(String),
    /// Startup configuration problem; fatal
    Config(String),
    Storage(String),
    Mining(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "Validation error: {}", e),
            LedgerError::Consensus(e) => write!(f, "Consensus error: {}", e),
            LedgerError::InsufficientFunds { available, requested } => write!(
                f,
                "Insufficient balance: have {} coins, tried to send {}",
                available, requested
            ),
            LedgerError::NoPeers => write!(f, "No active P2P connections"),
            LedgerError::PeerIo(msg) => write!(f, "Peer I/O error: {}", msg),
            LedgerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            LedgerError::Storage(msg) => write!(f, "Storage error: {}", msg),
            LedgerError::Mining(msg) => write!(f, "Mining error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Validation(err)
    }
}

impl From<ConsensusError> for LedgerError {
    fn from(err: ConsensusError) -> Self {
        LedgerError::Consensus(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::PeerIo(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

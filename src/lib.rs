// Peer-replicated proof-of-work ledger with gossip

pub mod core;
pub mod consensus;
pub mod ledger;
pub mod storage;
pub mod network;
pub mod wallet;
pub mod config;
pub mod error;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{Address, Block, Hash256, Transaction, TxIdentity};
pub use crate::consensus::{BlockValidator, ConsensusError, Difficulty, Miner, RewardPolicy, ValidationError};
pub use crate::ledger::{Admission, Ledger, Mempool, ReplaceOutcome};
pub use crate::storage::ChainStore;
pub use crate::network::{Message, Node, NodeState, PeerRegistry};
pub use crate::wallet::KeyPair;
pub use crate::config::NodeConfig;
pub use crate::error::{LedgerError, Result};
pub use crate::cli::{Cli, CliHandler};

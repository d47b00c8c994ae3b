// Consensus and validation logic

pub mod pow;
pub mod validation;
pub mod reward;

pub use pow::{Difficulty, Miner, MiningOutcome, MiningResult};
pub use validation::{BlockValidator, ConsensusError, TransactionValidator, ValidationError};
pub use reward::{RewardPolicy, RewardSchedule};

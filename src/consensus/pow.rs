// Proof of Work implementation

use crate::core::{Block, Hash256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the search loop checks for cancellation
const CANCEL_CHECK_INTERVAL: u64 = 1_024;

/// Required number of leading zero hex digits in a block hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difficulty(u32);

impl Difficulty {
    /// Largest meaningful value: every hex digit of a SHA256 hash
    pub const MAX: u32 = 64;

    pub fn new(zeros: u32) -> Result<Self, String> {
        if zeros == 0 || zeros > Self::MAX {
            return Err(format!("Difficulty must be between 1 and {}, got {}", Self::MAX, zeros));
        }
        Ok(Self(zeros))
    }

    pub fn zeros(&self) -> u32 {
        self.0
    }

    /// Check if a hash starts with the required zero run
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash.leading_zero_nibbles() >= self.0
    }
}

/// Proof of Work miner
#[derive(Debug, Clone)]
pub struct Miner {
    pub difficulty: Difficulty,
}

impl Miner {
    /// Create a new miner with fixed difficulty
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    /// Search nonces from 0 upwards until the block hash meets the
    /// difficulty or `cancel` is raised. On success the block's `nonce`
    /// and `hash` are updated in place.
    pub fn mine(&self, block: &mut Block, cancel: &AtomicBool) -> MiningResult {
        let start_time = Instant::now();
        let prefix = block.header_prefix();
        let mut attempts = 0u64;

        for nonce in 0..=u64::MAX {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Acquire) {
                log::debug!("Mining cancelled after {} attempts", attempts);
                return MiningResult {
                    outcome: MiningOutcome::Cancelled,
                    attempts,
                    duration: start_time.elapsed(),
                };
            }

            let hash = Block::hash_with_nonce(&prefix, nonce);
            attempts += 1;

            if self.difficulty.is_met_by(&hash) {
                block.nonce = nonce;
                block.hash = hash;
                return MiningResult {
                    outcome: MiningOutcome::Found { nonce, hash },
                    attempts,
                    duration: start_time.elapsed(),
                };
            }

            // Progress indicator every 100k attempts
            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!("Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }

        MiningResult {
            outcome: MiningOutcome::Exhausted,
            attempts,
            duration: start_time.elapsed(),
        }
    }

    /// Verify that a block satisfies PoW
    pub fn verify(&self, block: &Block) -> bool {
        self.difficulty.is_met_by(&block.hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found { nonce: u64, hash: Hash256 },
    Cancelled,
    /// Whole nonce space searched without success
    Exhausted,
}

/// Mining result
#[derive(Debug)]
pub struct MiningResult {
    pub outcome: MiningOutcome,
    /// Number of attempts
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, MiningOutcome::Found { .. })
    }

    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        self.attempts as f64 / self.duration.as_secs_f64().max(f64::EPSILON)
    }
}

// Mining reward policy

use serde::{Deserialize, Serialize};

/// When a block earns its miner a mint reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RewardPolicy {
    /// Every sealed block carries a reward
    EveryBlock,
    /// Reward once `threshold` non-mint transactions have been confirmed
    /// by this node's blocks since the last reward
    AfterTransactions {
        #[serde(default = "default_threshold")]
        threshold: u32,
    },
}

fn default_threshold() -> u32 {
    5
}

impl Default for RewardPolicy {
    fn default() -> Self {
        RewardPolicy::EveryBlock
    }
}

/// Tracks reward eligibility across locally mined blocks
#[derive(Debug, Clone)]
pub struct RewardSchedule {
    policy: RewardPolicy,
    amount: u64,
    since_last_reward: u32,
}

impl RewardSchedule {
    pub fn new(policy: RewardPolicy, amount: u64) -> Self {
        Self {
            policy,
            amount,
            since_last_reward: 0,
        }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    pub fn since_last_reward(&self) -> u32 {
        self.since_last_reward
    }

    /// Whether a block confirming `transfers` non-mint transactions earns a reward
    pub fn reward_due(&self, transfers: usize) -> bool {
        match self.policy {
            RewardPolicy::EveryBlock => true,
            RewardPolicy::AfterTransactions { threshold } => {
                self.since_last_reward.saturating_add(transfers as u32) >= threshold
            }
        }
    }

    /// Commit the counters once the block is actually on the chain
    pub fn record_block(&mut self, transfers: usize, rewarded: bool) {
        if rewarded {
            self.since_last_reward = 0;
        } else {
            self.since_last_reward = self.since_last_reward.saturating_add(transfers as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_block_always_rewards() {
        let schedule = RewardSchedule::new(RewardPolicy::EveryBlock, 100);
        assert!(schedule.reward_due(0));
        assert!(schedule.reward_due(3));
    }

    #[test]
    fn test_threshold_accumulates_across_blocks() {
        let mut schedule = RewardSchedule::new(RewardPolicy::AfterTransactions { threshold: 5 }, 100);

        assert!(!schedule.reward_due(3));
        schedule.record_block(3, false);

        assert!(!schedule.reward_due(1));
        schedule.record_block(1, false);
        assert_eq!(schedule.since_last_reward(), 4);

        assert!(schedule.reward_due(1));
        schedule.record_block(1, true);
        assert_eq!(schedule.since_last_reward(), 0);
    }

    #[test]
    fn test_policy_json() {
        let policy: RewardPolicy = serde_json::from_str(r#"{"policy":"every_block"}"#).unwrap();
        assert_eq!(policy, RewardPolicy::EveryBlock);

        let policy: RewardPolicy =
            serde_json::from_str(r#"{"policy":"after_transactions","threshold":3}"#).unwrap();
        assert_eq!(policy, RewardPolicy::AfterTransactions { threshold: 3 });

        let policy: RewardPolicy = serde_json::from_str(r#"{"policy":"after_transactions"}"#).unwrap();
        assert_eq!(policy, RewardPolicy::AfterTransactions { threshold: 5 });
    }
}

// Node configuration

use crate::consensus::{Difficulty, RewardPolicy, RewardSchedule};
use crate::core::Address;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Reward policy plus the amount minted per reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(flatten)]
    pub policy: RewardPolicy,
    #[serde(default = "default_reward_amount")]
    pub amount: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            policy: RewardPolicy::default(),
            amount: default_reward_amount(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Display name announced in PEER_INFO
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    /// P2P listen address; port 0 picks a free port
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Bootstrap peers dialled at startup
    #[serde(default)]
    pub peers: Vec<SocketAddr>,
    /// Leading zero hex digits required of a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default)]
    pub reward: RewardConfig,
    /// Coins minted for an address the first time it is funded
    #[serde(default = "default_funding_amount")]
    pub funding_amount: u64,
    /// How long a gossiped transaction suppresses re-gossip
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,
    /// Mine pending transactions on this interval; off when unset
    #[serde(default)]
    pub mine_interval_secs: Option<u64>,
    /// Let the periodic miner seal blocks with an empty mempool
    #[serde(default)]
    pub mine_empty_blocks: bool,
    /// Reward recipient for periodic mining
    #[serde(default)]
    pub miner_address: Option<Address>,
    /// Address whose direct notifications this node surfaces
    #[serde(default)]
    pub local_address: Option<Address>,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Persist the chain with sled here; in-memory only when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            listen: default_listen(),
            peers: Vec::new(),
            difficulty: default_difficulty(),
            reward: RewardConfig::default(),
            funding_amount: default_funding_amount(),
            recent_window_secs: default_recent_window_secs(),
            mine_interval_secs: None,
            mine_empty_blocks: false,
            miner_address: None,
            local_address: None,
            sync_interval_secs: default_sync_interval_secs(),
            data_dir: None,
        }
    }
}

impl NodeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: NodeConfig = serde_json::from_str(&text)
            .map_err(|e| LedgerError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Reject values the node cannot run with
    pub fn validate(&self) -> Result<()> {
        self.difficulty()?;

        if self.reward.amount == 0 {
            return Err(LedgerError::Config("reward.amount must be positive".to_string()));
        }
        if let RewardPolicy::AfterTransactions { threshold: 0 } = self.reward.policy {
            return Err(LedgerError::Config("reward.threshold must be positive".to_string()));
        }
        if self.funding_amount == 0 {
            return Err(LedgerError::Config("funding_amount must be positive".to_string()));
        }
        if self.recent_window_secs == 0 {
            return Err(LedgerError::Config("recent_window_secs must be positive".to_string()));
        }
        if self.sync_interval_secs == 0 {
            return Err(LedgerError::Config("sync_interval_secs must be positive".to_string()));
        }
        if self.mine_interval_secs == Some(0) {
            return Err(LedgerError::Config("mine_interval_secs must be positive".to_string()));
        }
        if self.mine_interval_secs.is_some() && self.miner_address.is_none() {
            return Err(LedgerError::Config(
                "miner_address is required when mine_interval_secs is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn difficulty(&self) -> Result<Difficulty> {
        Difficulty::new(self.difficulty).map_err(LedgerError::Config)
    }

    pub fn reward_schedule(&self) -> RewardSchedule {
        RewardSchedule::new(self.reward.policy, self.reward.amount)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_difficulty() -> u32 {
    2
}

fn default_reward_amount() -> u64 {
    100
}

fn default_funding_amount() -> u64 {
    500
}

fn default_recent_window_secs() -> u64 {
    300
}

fn default_sync_interval_secs() -> u64 {
    30
}

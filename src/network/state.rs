// Node state: everything gossip and local operations mutate together

use crate::config::NodeConfig;
use crate::consensus::{ConsensusError, Difficulty, RewardSchedule};
use crate::core::{Address, Block};
use crate::ledger::{Ledger, Mempool, ReplaceOutcome};
use crate::network::{Notification, PeerIdentity, PeerRegistry, RecentTransactions};
use crate::storage::ChainStore;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Notifications kept before the oldest are dropped
pub const INBOX_CAPACITY: usize = 256;

/// Ledger, mempool and peer registry live behind one lock so a message is
/// applied to all three before the next one is looked at
pub struct NodeState {
    pub ledger: Ledger,
    pub mempool: Mempool,
    pub peers: PeerRegistry,
    /// Addresses that already received their initial funding
    pub funded: HashSet<Address>,
    pub recent: RecentTransactions,
    pub rewards: RewardSchedule,
    /// Direct notifications addressed to `local_address`, oldest first
    pub inbox: VecDeque<Notification>,
    /// Announced in PEER_INFO
    pub identity: PeerIdentity,
    pub local_address: Option<Address>,
    /// Cancel flag of the search in flight, if any
    pub(crate) mining: Option<Arc<AtomicBool>>,
    pub(crate) store: Option<ChainStore>,
}

impl NodeState {
    pub fn new(config: &NodeConfig, difficulty: Difficulty) -> Self {
        Self {
            ledger: Ledger::new(difficulty),
            mempool: Mempool::new(),
            peers: PeerRegistry::new(),
            funded: HashSet::new(),
            recent: RecentTransactions::new(config.recent_window_secs.saturating_mul(1_000)),
            rewards: config.reward_schedule(),
            inbox: VecDeque::new(),
            identity: PeerIdentity {
                name: config.name.clone(),
                id: config.id.clone(),
                port: config.listen.port(),
            },
            local_address: config.local_address.clone(),
            mining: None,
            store: None,
        }
    }

    pub fn is_mining(&self) -> bool {
        self.mining.is_some()
    }

    /// Abort the search in flight; its tip is about to go stale
    pub fn cancel_mining(&self) {
        if let Some(flag) = &self.mining {
            log::info!("Cancelling in-flight mining");
            flag.store(true, Ordering::Release);
        }
    }

    /// Queue a notification for the local user, evicting the oldest when full
    pub fn push_notification(&mut self, notification: Notification) {
        if self.inbox.len() == INBOX_CAPACITY {
            self.inbox.pop_front();
        }
        self.inbox.push_back(notification);
    }

    /// Hand over every queued notification
    pub fn take_inbox(&mut self) -> Vec<Notification> {
        self.inbox.drain(..).collect()
    }

    /// Fork resolution plus everything that has to follow a successful swap
    pub fn adopt_chain(&mut self, candidate: Vec<Block>) -> ReplaceOutcome {
        let outcome = self.ledger.replace_with(candidate);
        if outcome.is_replaced() {
            let drained = self.mempool.drain_confirmed(&self.ledger);
            if drained > 0 {
                log::debug!("Dropped {} pending transactions confirmed by the new chain", drained);
            }
            self.cancel_mining();
            self.persist_chain();
        }
        outcome
    }

    /// Append a block to the tip, then clear what it confirmed
    pub fn accept_block(&mut self, block: Block) -> Result<(), ConsensusError> {
        self.ledger.append(block.clone())?;
        self.mempool.drain(&block);
        self.cancel_mining();
        self.persist_block(&block);
        Ok(())
    }

    pub(crate) fn attach_store(&mut self, store: ChainStore) {
        self.store = Some(store);
    }

    fn persist_block(&self, block: &Block) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store_block(block).and_then(|_| store.flush()) {
                log::error!("Failed to persist block {}: {}", block.index, e);
            }
        }
    }

    pub(crate) fn persist_chain(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store_chain(self.ledger.blocks()) {
                log::error!("Failed to persist chain: {}", e);
            }
        }
    }
}

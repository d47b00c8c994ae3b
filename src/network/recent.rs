// Time-bounded cache of recently gossiped transactions

use crate::core::TxIdentity;
use std::collections::HashMap;

/// Suppresses re-gossip of transactions seen within `window_ms`
#[derive(Debug)]
pub struct RecentTransactions {
    window_ms: u64,
    seen: HashMap<TxIdentity, u64>,
}

impl RecentTransactions {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            seen: HashMap::new(),
        }
    }

    /// Seen within the window as of `now_ms`
    pub fn contains(&self, id: &TxIdentity, now_ms: u64) -> bool {
        self.seen
            .get(id)
            .is_some_and(|&at| now_ms.saturating_sub(at) < self.window_ms)
    }

    pub fn insert(&mut self, id: TxIdentity, now_ms: u64) {
        self.seen.insert(id, now_ms);
    }

    /// Drop expired entries; returns how many were removed
    pub fn prune(&mut self, now_ms: u64) -> usize {
        let before = self.seen.len();
        let window = self.window_ms;
        self.seen.retain(|_, &mut at| now_ms.saturating_sub(at) < window);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

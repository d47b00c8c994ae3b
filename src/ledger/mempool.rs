// Pending transaction pool

use crate::consensus::TransactionValidator;
use crate::core::{Address, Block, Transaction, TxIdentity, Verifier};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use std::collections::{HashMap, HashSet};

/// Outcome of a successful admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Identity already pending or confirmed; not an error, but not relayed either
    Duplicate,
}

/// Mempool - transactions not yet in any block, in arrival order
#[derive(Debug, Default, Clone)]
pub struct Mempool {
    entries: Vec<Transaction>,
    index: HashSet<TxIdentity>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn contains(&self, id: &TxIdentity) -> bool {
        self.index.contains(id)
    }

    /// Admit a transaction against confirmed chain state.
    ///
    /// Sender balance is checked against confirmed blocks only; pending debits
    /// from the same sender are settled later by [`Mempool::select_for_block`].
    pub fn admit(
        &mut self,
        tx: Transaction,
        ledger: &Ledger,
        verifier: &dyn Verifier,
    ) -> Result<Admission, LedgerError> {
        let id = tx.identity();
        if self.index.contains(&id) || ledger.is_confirmed(&id) {
            log::debug!("Duplicate transaction ignored: {}", id);
            return Ok(Admission::Duplicate);
        }

        TransactionValidator::validate_for_mempool(&tx, verifier)?;

        if !tx.is_mint() {
            let available = ledger.balance_of(&tx.from, None);
            if available < i128::from(tx.amount) {
                return Err(LedgerError::InsufficientFunds {
                    available,
                    requested: tx.amount,
                });
            }
        }

        log::debug!("Admitted transaction {}", id);
        self.index.insert(id);
        self.entries.push(tx);
        Ok(Admission::Accepted)
    }

    /// Remove every pending transaction confirmed by `block`
    pub fn drain(&mut self, block: &Block) -> usize {
        let confirmed: HashSet<TxIdentity> = block.transactions.iter().map(|tx| tx.identity()).collect();
        self.remove_where(|id| confirmed.contains(id))
    }

    /// Remove every pending transaction the ledger now confirms (after a chain swap)
    pub fn drain_confirmed(&mut self, ledger: &Ledger) -> usize {
        self.remove_where(|id| ledger.is_confirmed(id))
    }

    /// Pick the pending transactions that still fit confirmed balances, in
    /// arrival order. Entries that would overdraw their sender are evicted.
    pub fn select_for_block(&mut self, ledger: &Ledger) -> Vec<Transaction> {
        let mut spent: HashMap<&Address, i128> = HashMap::new();
        let mut included = Vec::new();
        let mut evicted = HashSet::new();

        for tx in &self.entries {
            let id = tx.identity();
            if ledger.is_confirmed(&id) {
                evicted.insert(id);
                continue;
            }
            if tx.is_mint() {
                included.push(tx.clone());
                continue;
            }

            let already = spent.get(&tx.from).copied().unwrap_or(0);
            let available = ledger.balance_of(&tx.from, None) - already;
            if available < i128::from(tx.amount) {
                log::warn!(
                    "Evicting {}: sender has {} left, needs {}",
                    id,
                    available,
                    tx.amount
                );
                evicted.insert(id);
                continue;
            }

            *spent.entry(&tx.from).or_insert(0) += i128::from(tx.amount);
            included.push(tx.clone());
        }

        if !evicted.is_empty() {
            self.remove_where(|id| evicted.contains(id));
        }
        included
    }

    fn remove_where<F: Fn(&TxIdentity) -> bool>(&mut self, predicate: F) -> usize {
        let before = self.entries.len();
        let index = &mut self.index;
        self.entries.retain(|tx| {
            let id = tx.identity();
            if predicate(&id) {
                index.remove(&id);
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }
}

// Read-only views over the ledger: balances and per-address history

use crate::core::{Address, Transaction};
use crate::ledger::{Ledger, Mempool};
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a transaction currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Confirmed { block_index: u64 },
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub tx: Transaction,
    #[serde(flatten)]
    pub status: TxStatus,
}

impl TransactionRecord {
    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }
}

fn apply(balances: &mut BTreeMap<Address, i128>, tx: &Transaction) {
    if !tx.is_mint() {
        *balances.entry(tx.from.clone()).or_insert(0) -= i128::from(tx.amount);
    }
    *balances.entry(tx.to.clone()).or_insert(0) += i128::from(tx.amount);
}

impl Ledger {
    /// Credits minus debits across the chain, optionally with pending
    /// transactions folded in. The mint address is never debited.
    pub fn balance_of(&self, address: &Address, pending: Option<&Mempool>) -> i128 {
        let confirmed = self.blocks().iter().flat_map(|b| b.transactions.iter());
        let pending = pending.into_iter().flat_map(|pool| pool.pending().iter());

        confirmed.chain(pending).fold(0i128, |balance, tx| {
            let mut balance = balance;
            if &tx.to == address {
                balance += i128::from(tx.amount);
            }
            if &tx.from == address && !tx.is_mint() {
                balance -= i128::from(tx.amount);
            }
            balance
        })
    }

    /// Every confirmed transaction touching `address` in chain order,
    /// followed by matching pending ones
    pub fn transactions_for(&self, address: &Address, pending: &Mempool) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = self
            .blocks()
            .iter()
            .flat_map(|block| {
                block
                    .transactions
                    .iter()
                    .filter(|tx| tx.touches(address))
                    .map(move |tx| TransactionRecord {
                        tx: tx.clone(),
                        status: TxStatus::Confirmed { block_index: block.index },
                    })
            })
            .collect();

        records.extend(
            pending
                .pending()
                .iter()
                .filter(|tx| tx.touches(address))
                .map(|tx| TransactionRecord {
                    tx: tx.clone(),
                    status: TxStatus::Pending,
                }),
        );
        records
    }

    /// Confirmed balance of every address that appears on the chain
    pub fn all_balances(&self) -> BTreeMap<Address, i128> {
        let mut balances = BTreeMap::new();
        for tx in self.blocks().iter().flat_map(|b| b.transactions.iter()) {
            apply(&mut balances, tx);
        }
        balances
    }
}

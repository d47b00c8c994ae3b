// Chain state: blocks, pending pool and balance queries

pub mod chain;
pub mod mempool;
pub mod query;

pub use chain::{Ledger, ReplaceOutcome};
pub use mempool::{Admission, Mempool};
pub use query::{TransactionRecord, TxStatus};

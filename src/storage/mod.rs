// Storage layer for the local chain

mod chain_store;

pub use chain_store::ChainStore;

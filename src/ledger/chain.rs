// The local chain: append-only, hash-linked, rooted at the fixed genesis

use crate::consensus::{BlockValidator, ConsensusError, Difficulty};
use crate::core::{Block, TxIdentity};
use std::collections::HashSet;

/// Result of offering a competing chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced { previous_len: usize, new_len: usize },
    /// Candidate is not strictly longer; ties keep the first-seen chain
    NotLonger,
    Invalid(ConsensusError),
}

impl ReplaceOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced { .. })
    }
}

/// Ledger - owns the block sequence
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    validator: BlockValidator,
    /// Identities of every confirmed transaction
    confirmed: HashSet<TxIdentity>,
}

impl Ledger {
    /// A fresh chain holding only genesis
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            validator: BlockValidator::new(difficulty),
            confirmed: HashSet::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // Never empty: constructed with genesis and only replaced by validated chains
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.validator.difficulty()
    }

    pub fn validator(&self) -> &BlockValidator {
        &self.validator
    }

    /// Full validation of a chain from genesis
    pub fn validate(&self, chain: &[Block]) -> Result<(), ConsensusError> {
        self.validator.validate_chain(chain)
    }

    pub fn is_valid_chain(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }

    /// Fast path: accept `block` only as the direct successor of the tip.
    /// Ancestors are not re-validated.
    pub fn append(&mut self, block: Block) -> Result<(), ConsensusError> {
        self.validator.validate_successor(self.tip(), &block)?;

        self.confirmed
            .extend(block.transactions.iter().map(|tx| tx.identity()));
        log::debug!("Appended block {} ({})", block.index, block.hash);
        self.blocks.push(block);
        Ok(())
    }

    /// Longest valid chain wins; anything else is a no-op
    pub fn replace_with(&mut self, candidate: Vec<Block>) -> ReplaceOutcome {
        if candidate.len() <= self.blocks.len() {
            log::debug!(
                "Received chain is not longer than the current chain ({} vs {})",
                candidate.len(),
                self.blocks.len()
            );
            return ReplaceOutcome::NotLonger;
        }

        if let Err(e) = self.validate(&candidate) {
            log::warn!("Received chain is invalid: {}", e);
            return ReplaceOutcome::Invalid(e);
        }

        let previous_len = self.blocks.len();
        self.blocks = candidate;
        self.confirmed = self
            .blocks
            .iter()
            .flat_map(|b| b.transactions.iter().map(|tx| tx.identity()))
            .collect();

        log::info!("Replaced chain: {} -> {} blocks", previous_len, self.blocks.len());
        ReplaceOutcome::Replaced {
            previous_len,
            new_len: self.blocks.len(),
        }
    }

    pub fn is_confirmed(&self, id: &TxIdentity) -> bool {
        self.confirmed.contains(id)
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::*;
    use crate::core::{Address, Hash256, Transaction};

    fn reward(n: u64) -> Vec<Transaction> {
        vec![Transaction::mint(Address::new("02aa"), 100, n)]
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = Ledger::new(difficulty());
        assert_eq!(ledger.len(), 1);
        assert_eq!(*ledger.tip(), Block::genesis());
    }

    #[test]
    fn test_append_successor() {
        let mut ledger = Ledger::new(difficulty());
        let block = mine_on(ledger.tip(), reward(1));

        assert!(ledger.append(block.clone()).is_ok());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.tip().hash, block.hash);
        assert!(ledger.is_confirmed(&block.transactions[0].identity()));
    }

    #[test]
    fn test_append_rejects_wrong_parent() {
        let mut ledger = Ledger::new(difficulty());
        let stale = mine_on(ledger.tip(), reward(1));
        mine_into(&mut ledger, reward(2));

        assert_eq!(
            ledger.append(stale),
            Err(ConsensusError::BrokenLink { index: 1 })
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_append_rejects_tampered_block() {
        let mut ledger = Ledger::new(difficulty());
        let mut block = mine_on(ledger.tip(), reward(1));
        block.transactions[0].amount = 9_999;

        assert_eq!(
            ledger.append(block),
            Err(ConsensusError::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn test_replace_with_longer_valid_chain() {
        let mut ours = Ledger::new(difficulty());
        mine_into(&mut ours, reward(1));

        let mut theirs = Ledger::new(difficulty());
        mine_into(&mut theirs, reward(10));
        mine_into(&mut theirs, reward(11));

        let outcome = ours.replace_with(theirs.blocks().to_vec());
        assert_eq!(outcome, ReplaceOutcome::Replaced { previous_len: 2, new_len: 3 });
        assert_eq!(ours.blocks(), theirs.blocks());

        // Confirmed set follows the adopted chain
        assert!(!ours.is_confirmed(&reward(1)[0].identity()));
        assert!(ours.is_confirmed(&reward(11)[0].identity()));
    }

    #[test]
    fn test_replace_with_equal_length_keeps_first_seen() {
        let mut ours = Ledger::new(difficulty());
        mine_into(&mut ours, reward(1));
        let before = ours.blocks().to_vec();

        let mut theirs = Ledger::new(difficulty());
        mine_into(&mut theirs, reward(2));

        assert_eq!(ours.replace_with(theirs.blocks().to_vec()), ReplaceOutcome::NotLonger);
        assert_eq!(ours.blocks(), &before[..]);
    }

    #[test]
    fn test_replace_with_shorter_chain_is_noop() {
        let mut ours = Ledger::new(difficulty());
        mine_into(&mut ours, reward(1));
        mine_into(&mut ours, reward(2));

        assert_eq!(ours.replace_with(vec![Block::genesis()]), ReplaceOutcome::NotLonger);
        assert_eq!(ours.len(), 3);
    }

    #[test]
    fn test_replace_with_tampered_longer_chain_is_noop() {
        let mut ours = Ledger::new(difficulty());
        mine_into(&mut ours, reward(1));
        let before = ours.blocks().to_vec();

        let mut theirs = Ledger::new(difficulty());
        mine_into(&mut theirs, reward(10));
        mine_into(&mut theirs, reward(11));
        mine_into(&mut theirs, reward(12));
        let mut candidate = theirs.blocks().to_vec();
        candidate[2].hash = Hash256::new([0; 32]);

        let outcome = ours.replace_with(candidate);
        assert!(matches!(outcome, ReplaceOutcome::Invalid(_)));
        assert_eq!(ours.blocks(), &before[..]);
    }

    #[test]
    fn test_validate_detects_genesis_change() {
        let ledger = Ledger::new(difficulty());
        let mut chain = ledger.blocks().to_vec();
        chain[0].timestamp += 1;
        chain[0].hash = chain[0].calculate_hash();

        assert!(!ledger.is_valid_chain(&chain));
    }
}

// Applying inbound gossip to node state

use crate::core::{Address, Block, Transaction, Verifier};
use crate::error::{LedgerError, Result};
use crate::ledger::{Admission, ReplaceOutcome};
use crate::network::{Message, Notification, NodeState, PeerIdentity, Priority};

impl NodeState {
    /// Apply one message received from peer `origin`.
    ///
    /// Errors are for the caller to log; none of them leave the state
    /// partially updated.
    pub fn handle_message(
        &mut self,
        origin: u64,
        message: Message,
        verifier: &dyn Verifier,
        now_ms: u64,
    ) -> Result<()> {
        match message {
            Message::GetChain => self.on_get_chain(origin),
            Message::Chain { data } => {
                self.on_chain(origin, data);
                Ok(())
            }
            Message::NewTransaction { data } => self.on_transaction(origin, data, verifier, now_ms),
            Message::NewBlock { data, priority } => {
                self.on_block(origin, data, priority);
                Ok(())
            }
            Message::PeerInfo { data } => {
                self.on_peer_info(origin, data);
                Ok(())
            }
            Message::DirectNotification { recipient_address, data } => {
                self.on_direct_notification(&recipient_address, data);
                Ok(())
            }
        }
    }

    fn on_get_chain(&mut self, origin: u64) -> Result<()> {
        log::debug!("Peer {} requested the chain ({} blocks)", origin, self.ledger.len());
        let snapshot = Message::Chain {
            data: self.ledger.blocks().to_vec(),
        };
        self.peers.send_to(origin, &snapshot)
    }

    fn on_chain(&mut self, origin: u64, chain: Vec<Block>) {
        match self.adopt_chain(chain) {
            ReplaceOutcome::Replaced { previous_len, new_len } => {
                log::info!(
                    "Adopted chain from peer {}: {} -> {} blocks",
                    origin,
                    previous_len,
                    new_len
                );
            }
            ReplaceOutcome::NotLonger => {}
            ReplaceOutcome::Invalid(e) => {
                log::warn!("Rejected chain from peer {}: {}", origin, e);
            }
        }
    }

    fn on_transaction(
        &mut self,
        origin: u64,
        tx: Transaction,
        verifier: &dyn Verifier,
        now_ms: u64,
    ) -> Result<()> {
        let id = tx.identity();
        if self.recent.contains(&id, now_ms) {
            log::debug!("Transaction {} already processed", id);
            return Ok(());
        }

        // Rejected transactions stay out of the cache; they may become
        // valid once the block funding them arrives
        let admission = self.mempool.admit(tx.clone(), &self.ledger, verifier)?;
        self.recent.insert(id.clone(), now_ms);

        match admission {
            Admission::Accepted => {
                log::info!(
                    "Accepted transaction from peer {}: {} -> {} ({} coins)",
                    origin,
                    tx.from.short(),
                    tx.to.short(),
                    tx.amount
                );
                self.peers.broadcast_except(&Message::NewTransaction { data: tx }, origin);
            }
            Admission::Duplicate => {
                log::debug!("Transaction {} already pending or confirmed", id);
            }
        }
        Ok(())
    }

    fn on_block(&mut self, origin: u64, block: Block, priority: Option<Priority>) {
        if block.hash == self.ledger.tip().hash {
            log::debug!("Block {} already at tip", block.index);
            return;
        }

        let index = block.index;
        let hash = block.hash;
        match self.accept_block(block.clone()) {
            Ok(()) => {
                log::info!(
                    "Appended block {} ({}) from peer {}{}",
                    index,
                    hash,
                    origin,
                    if priority == Some(Priority::High) { " [high priority]" } else { "" }
                );
                self.peers.broadcast_except(
                    &Message::NewBlock {
                        data: block,
                        priority,
                    },
                    origin,
                );
            }
            // No ancestor back-fill; the periodic chain exchange closes gaps
            Err(e) => {
                log::warn!("Ignoring block {} from peer {}: {}", index, origin, e);
            }
        }
    }

    fn on_peer_info(&mut self, origin: u64, identity: PeerIdentity) {
        log::info!(
            "Peer {} is {} (id {}, port {})",
            origin,
            if identity.name.is_empty() { "unnamed" } else { identity.name.as_str() },
            identity.id,
            identity.port
        );
        self.peers.set_identity(origin, identity);
    }

    fn on_direct_notification(&mut self, recipient: &Address, notification: Notification) {
        if self.local_address.as_ref() != Some(recipient) {
            log::debug!("Notification for {} is not for this node", recipient.short());
            return;
        }

        match &notification {
            Notification::PaymentReceived(notice) => {
                log::info!(
                    "Payment notification: received {} coins from {}",
                    notice.amount,
                    notice.from.short()
                );
            }
        }
        self.push_notification(notification);
    }
}

/// Turn a handler error into the log line it deserves
pub(crate) fn log_handler_error(origin: u64, kind: &str, err: &LedgerError) {
    match err {
        LedgerError::InsufficientFunds { .. } | LedgerError::Validation(_) => {
            log::warn!("Rejected {} from peer {}: {}", kind, origin, err);
        }
        LedgerError::PeerIo(_) => {
            log::debug!("Could not answer {} from peer {}: {}", kind, origin, err);
        }
        _ => log::error!("Error handling {} from peer {}: {}", kind, origin, err),
    }
}

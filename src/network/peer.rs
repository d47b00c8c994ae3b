// Peer connection management

use crate::error::{LedgerError, Result};
use crate::network::{Message, PeerIdentity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Which side opened the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Live connection as seen by the registry. The socket itself is owned by
/// the connection's writer task; `outbound` feeds it encoded lines.
#[derive(Debug)]
pub struct PeerHandle {
    pub id: u64,
    pub addr: SocketAddr,
    pub direction: Direction,
    pub identity: Option<PeerIdentity>,
    outbound: mpsc::Sender<String>,
}

/// Peer information for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub id: u64,
    pub addr: SocketAddr,
    pub direction: Direction,
    pub identity: Option<PeerIdentity>,
}

/// Outcome of a broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Peers dropped because their write side failed
    pub pruned: Vec<u64>,
}

/// Peer registry - every live connection keyed by connection id
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeMap<u64, PeerHandle>,
    next_id: u64,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection and return its id
    pub fn register(&mut self, addr: SocketAddr, direction: Direction, outbound: mpsc::Sender<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.peers.insert(
            id,
            PeerHandle {
                id,
                addr,
                direction,
                identity: None,
                outbound,
            },
        );
        log::info!("Peer {} registered ({:?} {}), {} connected", id, direction, addr, self.peers.len());
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<PeerHandle> {
        let removed = self.peers.remove(&id);
        if let Some(peer) = &removed {
            log::info!("Peer {} ({}) removed, {} connected", id, peer.addr, self.peers.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn set_identity(&mut self, id: u64, identity: PeerIdentity) {
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.identity = Some(identity);
        }
    }

    pub fn list(&self) -> Vec<PeerInfo> {
        self.peers
            .values()
            .map(|p| PeerInfo {
                id: p.id,
                addr: p.addr,
                direction: p.direction,
                identity: p.identity.clone(),
            })
            .collect()
    }

    /// Queue `message` for one peer. A failed write prunes the peer.
    pub fn send_to(&mut self, id: u64, message: &Message) -> Result<()> {
        let line = message.encode()?;
        let peer = self
            .peers
            .get(&id)
            .ok_or_else(|| LedgerError::PeerIo(format!("Peer {} is not connected", id)))?;

        match Self::queue(peer, line) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.remove(id);
                Err(e)
            }
        }
    }

    /// Queue `message` for every peer
    pub fn broadcast(&mut self, message: &Message) -> BroadcastReport {
        self.broadcast_filtered(message, None)
    }

    /// Queue `message` for every peer except `origin`
    pub fn broadcast_except(&mut self, message: &Message, origin: u64) -> BroadcastReport {
        self.broadcast_filtered(message, Some(origin))
    }

    fn broadcast_filtered(&mut self, message: &Message, skip: Option<u64>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let line = match message.encode() {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to encode {}: {}", message.message_type(), e);
                return report;
            }
        };

        for peer in self.peers.values() {
            if Some(peer.id) == skip {
                continue;
            }
            match Self::queue(peer, line.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::warn!("Dropping peer {} ({}): {}", peer.id, peer.addr, e);
                    report.pruned.push(peer.id);
                }
            }
        }

        for id in &report.pruned {
            self.remove(*id);
        }

        log::debug!(
            "Broadcast {} to {} peers ({} pruned)",
            message.message_type(),
            report.delivered,
            report.pruned.len()
        );
        report
    }

    fn queue(peer: &PeerHandle, line: String) -> Result<()> {
        peer.outbound.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => LedgerError::PeerIo(format!("send queue to {} is full", peer.addr)),
            TrySendError::Closed(_) => LedgerError::PeerIo(format!("connection to {} is closed", peer.addr)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_register_and_remove() {
        let mut registry = PeerRegistry::new();
        let (tx, _rx) = mpsc::channel(4);

        let id = registry.register(addr(3001), Direction::Outbound, tx);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(id));

        registry.set_identity(id, PeerIdentity { name: "bob".into(), id: "7".into(), port: 3001 });
        assert_eq!(registry.list()[0].identity.as_ref().map(|i| i.name.as_str()), Some("bob"));

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_broadcast_prunes_failed_peer() {
        let mut registry = PeerRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, rx2) = mpsc::channel(4);
        let (tx3, mut rx3) = mpsc::channel(4);

        let first = registry.register(addr(3001), Direction::Outbound, tx1);
        let second = registry.register(addr(3002), Direction::Outbound, tx2);
        let third = registry.register(addr(3003), Direction::Inbound, tx3);

        // Peer #2's writer is gone
        drop(rx2);

        let report = registry.broadcast(&Message::GetChain);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, vec![second]);

        assert_eq!(rx1.try_recv().unwrap(), "{\"type\":\"GET_CHAIN\"}\n");
        assert_eq!(rx3.try_recv().unwrap(), "{\"type\":\"GET_CHAIN\"}\n");

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(first));
        assert!(!registry.contains(second));
        assert!(registry.contains(third));
    }

    #[test]
    fn test_broadcast_except_origin() {
        let mut registry = PeerRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        let origin = registry.register(addr(3001), Direction::Inbound, tx1);
        registry.register(addr(3002), Direction::Outbound, tx2);

        let report = registry.broadcast_except(&Message::GetChain, origin);
        assert_eq!(report.delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_full_queue_prunes() {
        let mut registry = PeerRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = registry.register(addr(3001), Direction::Outbound, tx);

        assert!(registry.send_to(id, &Message::GetChain).is_ok());
        assert!(matches!(
            registry.send_to(id, &Message::GetChain),
            Err(LedgerError::PeerIo(_))
        ));
        assert!(!registry.contains(id));
    }
}

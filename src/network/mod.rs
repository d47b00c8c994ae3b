// P2P networking: newline-delimited JSON gossip over TCP

mod message;
mod peer;
mod recent;
mod state;
mod gossip;
mod node;

pub use message::{
    read_frame, Frame, Message, Notification, PaymentNotice, PeerIdentity, Priority, MAX_MESSAGE_BYTES,
    MESSAGE_TYPES,
};
pub use peer::{BroadcastReport, Direction, PeerHandle, PeerInfo, PeerRegistry};
pub use recent::RecentTransactions;
pub use state::{NodeState, INBOX_CAPACITY};
pub use node::Node;

// Core ledger data structures

mod types;
mod transaction;
mod block;
mod serialize;
mod hash;
mod signature;
mod clock;

pub use types::*;
pub use transaction::*;
pub use block::*;
pub use serialize::*;
pub use hash::*;
pub use signature::{Signer, Verifier, Secp256k1Verifier};
pub use clock::{Clock, SystemClock, ManualClock};

// Local signing keys

mod keypair;

pub use keypair::KeyPair;

// Key management
//
// Keys live in memory only; generating and storing key files belongs to
// whatever front end drives the node.

use crate::core::{Address, Hash256, Signer};
use rand::rngs::OsRng;
use secp256k1::{Secp256k1, SecretKey, PublicKey, Message};

/// secp256k1 key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub address: Address,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let secret_key = SecretKey::new(&mut rng);
        Self::from_secret_key(secret_key)
    }

    /// Rebuild from a hex-encoded 32-byte secret
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| format!("Invalid secret key hex: {}", e))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| format!("Invalid secret key: {}", e))?;
        Ok(Self::from_secret_key(secret_key))
    }

    fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = secret_key.public_key(&secp);
        let address = Address(hex::encode(public_key.serialize()));

        Self {
            secret_key,
            public_key,
            address,
        }
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }
}

impl Signer for KeyPair {
    fn sign(&self, digest: &Hash256) -> Vec<u8> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest.as_bytes());
        secp.sign_ecdsa(&message, &self.secret_key)
            .serialize_der()
            .to_vec()
    }

    fn address(&self) -> Address {
        self.address.clone()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

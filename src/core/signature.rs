// Signing and verification capabilities
//
// The ledger never holds private keys; it only asks a Verifier whether a
// signature over a transaction digest was produced by the sender's key.

use crate::core::{Address, Hash256};
use secp256k1::{Secp256k1, Message, PublicKey, VerifyOnly, ecdsa::Signature};

/// Produces signatures over 32-byte digests
pub trait Signer {
    fn sign(&self, digest: &Hash256) -> Vec<u8>;

    /// Address whose key this signer holds
    fn address(&self) -> Address;
}

/// Checks a signature over a digest against a public address
pub trait Verifier: Send + Sync {
    fn verify(&self, digest: &Hash256, signature: &[u8], address: &Address) -> bool;
}

/// ECDSA over secp256k1; addresses are hex-encoded compressed public keys
/// and signatures are DER encoded
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    fn verify_checked(
        &self,
        digest: &Hash256,
        signature: &[u8],
        address: &Address,
    ) -> Result<bool, String> {
        let pubkey_bytes = address.to_pubkey_bytes()?;
        let pubkey = PublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| format!("Invalid public key: {}", e))?;

        let signature = Signature::from_der(signature)
            .map_err(|e| format!("Invalid signature: {}", e))?;

        let message = Message::from_digest(*digest.as_bytes());

        Ok(self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok())
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier for Secp256k1Verifier {
    fn verify(&self, digest: &Hash256, signature: &[u8], address: &Address) -> bool {
        match self.verify_checked(digest, signature, address) {
            Ok(valid) => valid,
            Err(e) => {
                log::debug!("Signature check failed for {}: {}", address.short(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sha256;
    use crate::wallet::KeyPair;

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let digest = sha256(b"transfer");

        let signature = kp.sign(&digest);
        let verifier = Secp256k1Verifier::new();

        assert!(verifier.verify(&digest, &signature, &kp.address()));
    }

    #[test]
    fn test_verify_wrong_key() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let digest = sha256(b"transfer");

        let signature = kp2.sign(&digest);
        let verifier = Secp256k1Verifier::new();

        assert!(!verifier.verify(&digest, &signature, &kp1.address()));
    }

    #[test]
    fn test_verify_garbage_inputs() {
        let verifier = Secp256k1Verifier::new();
        let digest = sha256(b"transfer");

        assert!(!verifier.verify(&digest, &[1, 2, 3], &Address::new("not-hex")));
        assert!(!verifier.verify(&digest, &[], &Address::new("02abcd")));
    }
}

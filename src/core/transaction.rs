// Transaction data structures

use crate::core::{Address, Hash256, sha256, Signer, Verifier};
use crate::core::serialize::{CanonicalEncode, write_var_bytes, write_u64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// De-duplication key: (from, to, amount, timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxIdentity {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub timestamp: u64,
}

impl fmt::Display for TxIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.from.short(),
            self.to.short(),
            self.amount,
            self.timestamp
        )
    }
}

/// Signed value transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address (public key), or the mint sentinel
    pub from: Address,
    /// Recipient address
    pub to: Address,
    /// Amount in whole coins
    pub amount: u64,
    /// Creation time, milliseconds since epoch
    pub timestamp: u64,
    /// DER signature over `digest()`, empty for mint transactions
    #[serde(with = "hex", default)]
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Create an unsigned transfer
    pub fn new(from: Address, to: Address, amount: u64, timestamp: u64) -> Self {
        Self {
            from,
            to,
            amount,
            timestamp,
            signature: Vec::new(),
        }
    }

    /// Protocol-minted coins (mining reward or initial funding)
    pub fn mint(to: Address, amount: u64, timestamp: u64) -> Self {
        Self::new(Address::mint(), to, amount, timestamp)
    }

    pub fn is_mint(&self) -> bool {
        self.from.is_mint()
    }

    pub fn identity(&self) -> TxIdentity {
        TxIdentity {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            timestamp: self.timestamp,
        }
    }

    /// Digest over (from, to, amount, timestamp); never covers the signature
    pub fn digest(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.encode_unsigned(&mut buf).expect("in-memory write");
        sha256(&buf)
    }

    /// Sign with the sender's key. Mint transactions stay unsigned.
    pub fn sign(&mut self, signer: &dyn Signer) {
        if self.is_mint() {
            return;
        }
        self.signature = signer.sign(&self.digest());
    }

    /// Mint transactions are always valid; everything else needs a
    /// signature from `from` over the digest
    pub fn verify_signature(&self, verifier: &dyn Verifier) -> bool {
        if self.is_mint() {
            return true;
        }
        if self.signature.is_empty() {
            return false;
        }
        verifier.verify(&self.digest(), &self.signature, &self.from)
    }

    pub fn touches(&self, address: &Address) -> bool {
        &self.from == address || &self.to == address
    }

    fn encode_unsigned<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_var_bytes(writer, self.from.as_str().as_bytes())?;
        write_var_bytes(writer, self.to.as_str().as_bytes())?;
        write_u64(writer, self.amount)?;
        write_u64(writer, self.timestamp)?;
        Ok(())
    }
}

impl CanonicalEncode for Transaction {
    fn encode_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.encode_unsigned(writer)?;
        write_var_bytes(writer, &self.signature)
    }
}

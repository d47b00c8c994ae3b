// Chain persistence using sled

use crate::core::{Block, Hash256};
use crate::error::{LedgerError, Result};
use sled::Db;
use std::path::Path;

/// Chain store - blocks keyed by hash plus a height index
pub struct ChainStore {
    db: Db,
}

impl ChainStore {
    /// Open (or create) the store at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing)
    pub fn memory() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .map_err(|e| LedgerError::Storage(format!("Failed to create memory db: {}", e)))?;
        Ok(Self { db })
    }

    /// Store one block and move the tip to it
    pub fn store_block(&self, block: &Block) -> Result<()> {
        let json = serde_json::to_vec(block)
            .map_err(|e| LedgerError::Storage(format!("Failed to encode block: {}", e)))?;

        self.db.insert(Self::block_key(&block.hash), json)?;
        self.db.insert(Self::height_key(block.index), block.hash.as_bytes().as_slice())?;
        self.db.insert(b"height", (block.index + 1).to_be_bytes().to_vec())?;
        Ok(())
    }

    /// Overwrite the stored chain with `blocks` (after a replacement)
    pub fn store_chain(&self, blocks: &[Block]) -> Result<()> {
        self.db.clear()?;
        for block in blocks {
            self.store_block(block)?;
        }
        self.flush()
    }

    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        match self.db.get(Self::block_key(hash))? {
            Some(data) => {
                let block = serde_json::from_slice(&data)
                    .map_err(|e| LedgerError::Storage(format!("Corrupt block {}: {}", hash, e)))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn get_hash_by_height(&self, height: u64) -> Result<Option<Hash256>> {
        match self.db.get(Self::height_key(height))? {
            Some(data) => Hash256::from_slice(&data).map(Some).map_err(LedgerError::Storage),
            None => Ok(None),
        }
    }

    /// Number of stored blocks; 0 for a fresh store
    pub fn chain_height(&self) -> Result<u64> {
        match self.db.get(b"height")? {
            Some(data) => {
                let bytes: [u8; 8] = data[..]
                    .try_into()
                    .map_err(|_| LedgerError::Storage(format!("Invalid height data length: {}", data.len())))?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    /// Every stored block in height order. Validation is up to the caller.
    pub fn load_chain(&self) -> Result<Vec<Block>> {
        let height = self.chain_height()?;
        let mut blocks = Vec::with_capacity(height as usize);

        for index in 0..height {
            let hash = self
                .get_hash_by_height(index)?
                .ok_or_else(|| LedgerError::Storage(format!("Missing height index {}", index)))?;
            let block = self
                .get_block(&hash)?
                .ok_or_else(|| LedgerError::Storage(format!("Missing block {}", hash)))?;
            blocks.push(block);
        }

        Ok(blocks)
    }

    /// Manually flush database (call after batch operations)
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // Helper: create key for block storage
    fn block_key(hash: &Hash256) -> Vec<u8> {
        let mut key = Vec::with_capacity(33);
        key.push(b'b');
        key.extend_from_slice(hash.as_bytes());
        key
    }

    // Helper: create key for height index; big-endian keeps sled's order
    fn height_key(height: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(9);
        key.push(b'h');
        key.extend_from_slice(&height.to_be_bytes());
        key
    }
}

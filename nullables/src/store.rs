//! Nullable store: thread-safe in-memory block storage for testing.

use keel_store::{BlockStore, StoreError};
use keel_types::BlockHash;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory block store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Debug, Default)]
pub struct NullStore {
    blocks: Mutex<HashMap<BlockHash, Vec<u8>>>,
    canonical: Mutex<HashMap<u64, BlockHash>>,
    best: Mutex<Option<BlockHash>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number present in the canonical index.
    pub fn canonical_height(&self) -> Option<u64> {
        self.canonical.lock().unwrap().keys().max().copied()
    }
}

impl BlockStore for NullStore {
    fn put_block(&self, hash: &BlockHash, block_bytes: &[u8]) -> Result<(), StoreError> {
        self.blocks
            .lock()
            .unwrap()
            .insert(*hash, block_bytes.to_vec());
        Ok(())
    }

    fn get_block(&self, hash: &BlockHash) -> Result<Vec<u8>, StoreError> {
        self.blocks
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }

    fn exists(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.blocks.lock().unwrap().contains_key(hash))
    }

    fn put_canonical(&self, number: u64, hash: &BlockHash) -> Result<(), StoreError> {
        self.canonical.lock().unwrap().insert(number, *hash);
        Ok(())
    }

    fn delete_canonical_above(&self, number: u64) -> Result<(), StoreError> {
        self.canonical.lock().unwrap().retain(|n, _| *n <= number);
        Ok(())
    }

    fn get_canonical(&self, number: u64) -> Result<Option<BlockHash>, StoreError> {
        Ok(self.canonical.lock().unwrap().get(&number).copied())
    }

    fn put_best(&self, hash: &BlockHash) -> Result<(), StoreError> {
        *self.best.lock().unwrap() = Some(*hash);
        Ok(())
    }

    fn get_best(&self) -> Result<Option<BlockHash>, StoreError> {
        Ok(*self.best.lock().unwrap())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }
}

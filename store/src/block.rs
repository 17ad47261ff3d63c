//! Block storage trait.

use crate::StoreError;
use keel_types::BlockHash;

/// Durable mapping from hash to block, number to canonical hash, and the
/// best-block marker.
///
/// Blocks are stored as opaque serialized bytes; encoding is the caller's
/// concern.
pub trait BlockStore: Send + Sync {
    /// Store a block (serialized bytes keyed by hash).
    fn put_block(&self, hash: &BlockHash, block_bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a block by hash.
    fn get_block(&self, hash: &BlockHash) -> Result<Vec<u8>, StoreError>;

    /// Check if a block exists.
    fn exists(&self, hash: &BlockHash) -> Result<bool, StoreError>;

    /// Record `hash` as the canonical block at `number`.
    fn put_canonical(&self, number: u64, hash: &BlockHash) -> Result<(), StoreError>;

    /// Drop canonical entries above `number` (the chain head moved lower).
    fn delete_canonical_above(&self, number: u64) -> Result<(), StoreError>;

    /// The canonical block hash at `number`, if any.
    fn get_canonical(&self, number: u64) -> Result<Option<BlockHash>, StoreError>;

    /// Remember the current best block.
    fn put_best(&self, hash: &BlockHash) -> Result<(), StoreError>;

    /// The last best block recorded, if any.
    fn get_best(&self) -> Result<Option<BlockHash>, StoreError>;

    /// Total number of blocks in the store.
    fn block_count(&self) -> Result<u64, StoreError>;
}

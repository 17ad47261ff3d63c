//! Orphan buffer: holds blocks whose parent is not yet known.
//!
//! A block that arrives before its parent is stored here keyed by the missing
//! parent hash. Once that parent connects, all waiting blocks are drained as a
//! batch and offered back to the block processor.

use keel_ledger::Block;
use keel_types::{BlockHash, Timestamp};
use std::collections::{HashMap, HashSet};

/// What happened to a block offered to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrphanAdd {
    /// Stored until its parent arrives.
    Buffered,
    /// The same block was already waiting.
    AlreadyBuffered,
    /// The buffer is at capacity; the block was dropped.
    Full,
}

/// A block waiting for its parent to arrive.
#[derive(Clone, Debug)]
struct OrphanEntry {
    block: Block,
    received_at: Timestamp,
}

/// Maps `parent_hash -> blocks waiting for it`.
pub struct OrphanBlocks {
    by_parent: HashMap<BlockHash, Vec<OrphanEntry>>,
    /// Hashes of every buffered block, for dedup.
    buffered: HashSet<BlockHash>,
    /// Maximum total entries allowed (prevents memory exhaustion from spam).
    max_size: usize,
}

impl OrphanBlocks {
    /// Create an empty buffer holding at most `max_size` blocks.
    pub fn new(max_size: usize) -> Self {
        Self {
            by_parent: HashMap::new(),
            buffered: HashSet::new(),
            max_size,
        }
    }

    /// Store `block` under its parent hash.
    pub fn add(&mut self, block: Block, now: Timestamp) -> OrphanAdd {
        let hash = block.hash();
        if self.buffered.contains(&hash) {
            return OrphanAdd::AlreadyBuffered;
        }
        if self.buffered.len() >= self.max_size {
            return OrphanAdd::Full;
        }
        self.buffered.insert(hash);
        self.by_parent
            .entry(block.parent_hash())
            .or_default()
            .push(OrphanEntry {
                block,
                received_at: now,
            });
        OrphanAdd::Buffered
    }

    /// Remove and return every block waiting for `parent`, in arrival order.
    pub fn take_children_of(&mut self, parent: &BlockHash) -> Vec<Block> {
        match self.by_parent.remove(parent) {
            Some(entries) => entries
                .into_iter()
                .map(|entry| {
                    self.buffered.remove(&entry.block.hash());
                    entry.block
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.buffered.contains(hash)
    }

    /// Total number of buffered blocks.
    pub fn len(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }

    /// Remove entries older than `max_age_secs` relative to `now`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_expired(&mut self, max_age_secs: u64, now: Timestamp) -> usize {
        let buffered = &mut self.buffered;
        let mut removed = 0;
        self.by_parent.retain(|_parent, entries| {
            entries.retain(|entry| {
                let expired = entry.received_at.has_expired(max_age_secs, now);
                if expired {
                    buffered.remove(&entry.block.hash());
                    removed += 1;
                }
                !expired
            });
            !entries.is_empty()
        });
        removed
    }
}

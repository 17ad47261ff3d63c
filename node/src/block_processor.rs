//! Chain state and block connection.
//!
//! The block processor owns every block connected to the local chain, the
//! canonical number index and the best block. Blocks whose parent is unknown
//! go to the orphan buffer and are connected as soon as the parent arrives.

use crate::fork_choice::{ChainTip, ForkChoice};
use crate::metrics::NodeMetrics;
use crate::node_event::{EventBus, NodeEvent};
use crate::orphan_blocks::{OrphanAdd, OrphanBlocks};
use crate::tracing_spans::block_span;
use crate::NodeError;
use keel_ledger::Block;
use keel_store::{BlockStore, StoreError};
use keel_types::{BlockHash, Clock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// Result of offering a single block to the processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// The block joined the local chain.
    Connected,
    /// The block was already part of the local chain; nothing changed.
    AlreadyKnown,
    /// The parent is unknown; the block waits in the orphan buffer (or was
    /// dropped because the buffer is full).
    Orphan,
}

/// A connected block with the difficulty accumulated up to it.
struct ChainEntry {
    block: Block,
    total_difficulty: u128,
}

pub struct BlockProcessor {
    blocks: HashMap<BlockHash, ChainEntry>,
    /// Canonical path from genesis to the best block.
    canonical: BTreeMap<u64, BlockHash>,
    best: Option<BlockHash>,
    /// The only genesis this chain accepts. Pinned up front or by the first
    /// genesis that connects.
    genesis: Option<BlockHash>,
    orphans: OrphanBlocks,
    fork_choice: Box<dyn ForkChoice>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    metrics: Arc<NodeMetrics>,
    /// Optional persistent store; every connected block is written through.
    store: Option<Arc<dyn BlockStore>>,
}

impl BlockProcessor {
    pub fn new(
        max_orphans: usize,
        fork_choice: Box<dyn ForkChoice>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            blocks: HashMap::new(),
            canonical: BTreeMap::new(),
            best: None,
            genesis: None,
            orphans: OrphanBlocks::new(max_orphans),
            fork_choice,
            clock,
            events,
            metrics,
            store: None,
        }
    }

    /// Write connected blocks, the canonical index and the best marker
    /// through to `store`.
    pub fn set_store(&mut self, store: Arc<dyn BlockStore>) {
        self.store = Some(store);
    }

    /// Accept only the genesis hashing to `hash`.
    pub fn set_genesis(&mut self, hash: BlockHash) {
        self.genesis = Some(hash);
    }

    pub fn genesis(&self) -> Option<BlockHash> {
        self.genesis
    }

    /// Offer a block to the chain.
    ///
    /// The caller is expected to have validated the block against its parent
    /// when the parent is known (see [`check_linkage`](Self::check_linkage)).
    /// Orphans freed by this block are re-checked here before they connect.
    pub fn process_block(&mut self, block: Block) -> ProcessResult {
        let hash = block.hash();
        if self.blocks.contains_key(&hash) {
            return ProcessResult::AlreadyKnown;
        }
        if !block.is_genesis() && !self.blocks.contains_key(&block.parent_hash()) {
            self.buffer_orphan(block);
            return ProcessResult::Orphan;
        }

        let mut advanced = Vec::new();
        let mut ready = VecDeque::from([block]);
        while let Some(next) = ready.pop_front() {
            let next_hash = next.hash();
            if self.blocks.contains_key(&next_hash) {
                continue;
            }
            if self.connect(next) {
                advanced.push(next_hash);
            }
            for child in self.orphans.take_children_of(&next_hash) {
                match self.check_linkage(&child) {
                    Ok(()) => ready.push_back(child),
                    Err(reason) => {
                        tracing::warn!(hash = %child.hash(), %reason, "discarding orphan");
                        self.metrics.orphans_dropped.inc();
                    }
                }
            }
        }
        self.metrics.orphan_count.set(self.orphans.len() as i64);

        // Listeners run only once the whole batch is connected, so a failing
        // listener cannot strand freed orphans.
        for hash in advanced {
            if let Some(entry) = self.blocks.get(&hash) {
                self.events.emit(&NodeEvent::NewBestBlock(entry.block.clone()));
            }
        }
        ProcessResult::Connected
    }

    /// Check that `block` extends its parent by exactly one, when the parent
    /// is known. Blocks with an unknown parent pass; they are checked again
    /// when the parent connects. A genesis passes only if it is the pinned
    /// one, or none is pinned yet.
    pub fn check_linkage(&self, block: &Block) -> Result<(), String> {
        if block.is_genesis() {
            return match self.genesis {
                Some(expected) if expected != block.hash() => {
                    Err("block is not this network's genesis".to_string())
                }
                _ => Ok(()),
            };
        }
        match self.blocks.get(&block.parent_hash()) {
            Some(parent) if parent.block.number() + 1 != block.number() => Err(format!(
                "block number {} does not follow parent number {}",
                block.number(),
                parent.block.number()
            )),
            _ => Ok(()),
        }
    }

    fn buffer_orphan(&mut self, block: Block) {
        let hash = block.hash();
        let parent = block.parent_hash();
        match self.orphans.add(block, self.clock.now()) {
            OrphanAdd::Buffered => {
                tracing::debug!(%hash, %parent, "buffered orphan block");
                self.metrics.orphans_buffered.inc();
            }
            OrphanAdd::AlreadyBuffered => {}
            OrphanAdd::Full => {
                tracing::warn!(%hash, %parent, "orphan buffer full, dropping block");
                self.metrics.orphans_dropped.inc();
            }
        }
        self.metrics.orphan_count.set(self.orphans.len() as i64);
    }

    /// Insert `block` and move the best block to it if the fork choice
    /// prefers it. Returns whether the best block changed.
    fn connect(&mut self, block: Block) -> bool {
        let hash = block.hash();
        if block.is_genesis() && self.genesis.is_none() {
            self.genesis = Some(hash);
        }
        let _span = block_span(&hash.to_string(), block.number()).entered();

        let parent_difficulty = self
            .blocks
            .get(&block.parent_hash())
            .map(|parent| parent.total_difficulty)
            .unwrap_or(0);
        let total_difficulty = parent_difficulty + u128::from(block.difficulty());

        if let Err(e) = self.persist_block(&block) {
            tracing::warn!(%hash, error = %e, "failed to persist block");
        }

        let advances = match self.best.and_then(|best| self.blocks.get(&best)) {
            None => true,
            Some(current) => self.fork_choice.prefers(
                &ChainTip {
                    block: &block,
                    total_difficulty,
                },
                &ChainTip {
                    block: &current.block,
                    total_difficulty: current.total_difficulty,
                },
            ),
        };

        self.blocks.insert(
            hash,
            ChainEntry {
                block,
                total_difficulty,
            },
        );
        self.metrics.blocks_connected.inc();
        tracing::debug!("block connected");

        if advances {
            self.set_best(hash);
            if let Some(entry) = self.blocks.get(&hash) {
                tracing::info!(number = entry.block.number(), "new best block");
            }
        }
        advances
    }

    /// Make `head` the best block and rewrite the canonical index along its
    /// ancestry, dropping entries above it.
    fn set_best(&mut self, head: BlockHash) {
        let Some(head_number) = self.blocks.get(&head).map(|entry| entry.block.number()) else {
            return;
        };

        let had_above = self.canonical.split_off(&(head_number + 1));
        if !had_above.is_empty() {
            if let Some(store) = &self.store {
                if let Err(e) = store.delete_canonical_above(head_number) {
                    tracing::warn!(error = %e, "failed to truncate canonical index");
                }
            }
        }

        let mut cursor = head;
        while let Some(entry) = self.blocks.get(&cursor) {
            let number = entry.block.number();
            if self.canonical.get(&number) == Some(&cursor) {
                break;
            }
            self.canonical.insert(number, cursor);
            if let Some(store) = &self.store {
                if let Err(e) = store.put_canonical(number, &cursor) {
                    tracing::warn!(number, error = %e, "failed to update canonical index");
                }
            }
            if entry.block.is_genesis() {
                break;
            }
            cursor = entry.block.parent_hash();
        }

        self.best = Some(head);
        if let Some(store) = &self.store {
            if let Err(e) = store.put_best(&head) {
                tracing::warn!(error = %e, "failed to record best block");
            }
        }
        self.metrics.best_block_number.set(head_number as i64);
    }

    fn persist_block(&self, block: &Block) -> Result<(), StoreError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let bytes =
            bincode::serialize(block).map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.put_block(&block.hash(), &bytes)
    }

    /// Rebuild chain state from the attached store, starting at its recorded
    /// best block and following parent links back to genesis.
    ///
    /// Returns the number of blocks loaded. No events are emitted.
    pub fn load_from_store(&mut self) -> Result<usize, NodeError> {
        let Some(store) = self.store.clone() else {
            return Ok(0);
        };
        let Some(best) = store.get_best()? else {
            return Ok(0);
        };

        let mut chain = Vec::new();
        let mut cursor = best;
        loop {
            let bytes = store.get_block(&cursor)?;
            let block: Block = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if block.hash() != cursor {
                return Err(StoreError::Corruption(format!(
                    "block stored under {cursor} hashes to {}",
                    block.hash()
                ))
                .into());
            }
            let done = block.is_genesis();
            if done {
                match self.genesis {
                    Some(expected) if expected != block.hash() => {
                        return Err(StoreError::Corruption(format!(
                            "stored chain starts at {} instead of genesis {expected}",
                            block.hash()
                        ))
                        .into());
                    }
                    _ => self.genesis = Some(block.hash()),
                }
            }
            cursor = block.parent_hash();
            chain.push(block);
            if done {
                break;
            }
        }

        let loaded = chain.len();
        let mut total_difficulty = 0u128;
        for block in chain.into_iter().rev() {
            total_difficulty += u128::from(block.difficulty());
            self.canonical.insert(block.number(), block.hash());
            self.blocks.insert(
                block.hash(),
                ChainEntry {
                    block,
                    total_difficulty,
                },
            );
        }
        self.best = Some(best);
        if let Some(number) = self.best_block_number() {
            self.metrics.best_block_number.set(number as i64);
        }
        tracing::info!(blocks = loaded, best = %best, "restored chain from store");
        Ok(loaded)
    }

    /// Discard orphans that have waited longer than `max_age_secs`.
    pub fn prune_orphans(&mut self, max_age_secs: u64) -> usize {
        let removed = self.orphans.prune_expired(max_age_secs, self.clock.now());
        if removed > 0 {
            tracing::debug!(removed, "pruned expired orphans");
            self.metrics.orphans_dropped.inc_by(removed as u64);
            self.metrics.orphan_count.set(self.orphans.len() as i64);
        }
        removed
    }

    pub fn best_block(&self) -> Option<&Block> {
        self.best
            .and_then(|hash| self.blocks.get(&hash))
            .map(|entry| &entry.block)
    }

    pub fn best_block_number(&self) -> Option<u64> {
        self.best_block().map(Block::number)
    }

    pub fn block_by_hash(&self, hash: &BlockHash) -> Option<&Block> {
        self.blocks.get(hash).map(|entry| &entry.block)
    }

    /// The block at `number` on the canonical path.
    pub fn block_by_number(&self, number: u64) -> Option<&Block> {
        self.canonical
            .get(&number)
            .and_then(|hash| self.block_by_hash(hash))
    }

    /// Accumulated difficulty from genesis to `hash`.
    pub fn total_difficulty(&self, hash: &BlockHash) -> Option<u128> {
        self.blocks.get(hash).map(|entry| entry.total_difficulty)
    }

    /// Number of connected blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_orphan(&self, hash: &BlockHash) -> bool {
        self.orphans.contains(hash)
    }
}

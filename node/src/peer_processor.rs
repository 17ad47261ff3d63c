//! Per-peer chain height tracking and catch-up request planning.

use keel_types::PeerId;
use std::collections::HashMap;
use std::ops::RangeInclusive;

#[allow(clippy::reversed_empty_ranges)]
const EMPTY: RangeInclusive<u64> = 1..=0;

#[derive(Clone, Copy, Debug, Default)]
struct PeerSyncState {
    /// Highest block number the peer has reported.
    best_block_number: u64,
    /// Highest block number already requested from the peer.
    requested_up_to: Option<u64>,
}

impl PeerSyncState {
    /// Request up to `max` numbers from `start` toward the peer's best.
    fn request_from(&mut self, start: u64, max: u64) -> RangeInclusive<u64> {
        let end = self
            .best_block_number
            .min(start.saturating_add(max - 1));
        self.requested_up_to = Some(end);
        start..=end
    }
}

/// Default number of blocks requested from a peer at once.
pub const DEFAULT_MAX_SYNC_BATCH: u64 = 4096;

/// Tracks how far ahead each peer is and which block numbers have already been
/// requested, so every number is asked of a given peer at most once.
///
/// Requests go out in batches of at most `max_sync_batch` numbers. A peer
/// that claims a far-away height therefore costs one batch per answered
/// batch, never one huge burst.
pub struct PeerProcessor {
    peers: HashMap<PeerId, PeerSyncState>,
    /// Highest block number any peer has reported.
    best_block_number: u64,
    max_sync_batch: u64,
}

impl PeerProcessor {
    pub fn new(max_sync_batch: u64) -> Self {
        Self {
            peers: HashMap::new(),
            best_block_number: 0,
            max_sync_batch: max_sync_batch.max(1),
        }
    }

    /// Record a peer's reported height and return the block numbers to
    /// request from it, ascending.
    ///
    /// The first status from a peer asks for numbers from 0; later ones ask
    /// only for numbers above the last request. A report at or below the last
    /// request asks for nothing.
    pub fn process_status(&mut self, peer: PeerId, reported: u64) -> RangeInclusive<u64> {
        self.best_block_number = self.best_block_number.max(reported);

        let max = self.max_sync_batch;
        let state = self.peers.entry(peer).or_default();
        state.best_block_number = state.best_block_number.max(reported);

        match state.requested_up_to {
            None => state.request_from(0, max),
            Some(last) if reported > last => state.request_from(last + 1, max),
            Some(_) => EMPTY,
        }
    }

    /// Note that `peer` sent block `number`. When that is the last block of
    /// the outstanding batch and the peer reported more, the next batch is
    /// returned; otherwise the range is empty.
    pub fn block_received(&mut self, peer: &PeerId, number: u64) -> RangeInclusive<u64> {
        let max = self.max_sync_batch;
        let Some(state) = self.peers.get_mut(peer) else {
            return EMPTY;
        };
        match state.requested_up_to {
            Some(last) if last == number && state.best_block_number > last => {
                state.request_from(last + 1, max)
            }
            _ => EMPTY,
        }
    }

    /// Highest block number reported by any peer.
    pub fn best_block_number(&self) -> u64 {
        self.best_block_number
    }

    pub fn peer_best_block_number(&self, peer: &PeerId) -> Option<u64> {
        self.peers.get(peer).map(|state| state.best_block_number)
    }

    /// Highest block number already requested from `peer`.
    pub fn requested_up_to(&self, peer: &PeerId) -> Option<u64> {
        self.peers.get(peer).and_then(|state| state.requested_up_to)
    }

    /// Forget a disconnected peer. The global watermark is kept.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.peers.remove(peer);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

//! Genesis block creation: the first block on each network.
//!
//! The genesis block has number 0 and `parent_hash: BlockHash::ZERO`. It differs
//! per [`NetworkId`] through its timestamp, so every network has a unique,
//! deterministic genesis hash.

use crate::Block;
use keel_crypto::empty_root;
use keel_types::{Address, BlockHash, NetworkId, Timestamp};

/// Difficulty recorded in every genesis block.
pub const GENESIS_DIFFICULTY: u64 = 1;

/// Create the genesis block for `network`.
pub fn genesis_block(network: NetworkId) -> Block {
    Block::new(
        0,
        BlockHash::ZERO,
        genesis_timestamp(network),
        Address::ZERO,
        GENESIS_DIFFICULTY,
        Vec::new(),
        empty_root(),
    )
}

/// The deterministic genesis hash for a network.
pub fn genesis_hash(network: NetworkId) -> BlockHash {
    genesis_block(network).hash()
}

fn genesis_timestamp(network: NetworkId) -> Timestamp {
    match network {
        NetworkId::Live => Timestamp::new(1_735_689_600),
        NetworkId::Test => Timestamp::new(1_735_689_601),
        NetworkId::Dev => Timestamp::new(1_735_689_602),
    }
}

//! Network message types for Keel node-to-node communication.
//!
//! Every message exchanged between nodes is one variant of [`Message`]. The
//! transport decodes frames into this enum before the node sees them, so
//! routing is a single exhaustive `match`.

pub mod channel;

pub use channel::MessageChannel;

use keel_ledger::{Block, Transaction};
use keel_types::{BlockHash, PeerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level P2P message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// A block, either freshly mined, relayed, or answering a request.
    Block(Block),
    /// A pending transaction.
    Transaction(Transaction),
    /// A peer's self-reported chain height.
    Status(Status),
    /// Ask a peer for the block with this hash.
    GetBlockByHash(BlockHash),
    /// Ask a peer for the canonical block at this height.
    GetBlockByNumber(u64),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Block(_) => MessageType::Block,
            Self::Transaction(_) => MessageType::Transaction,
            Self::Status(_) => MessageType::Status,
            Self::GetBlockByHash(_) => MessageType::GetBlockByHash,
            Self::GetBlockByNumber(_) => MessageType::GetBlockByNumber,
        }
    }
}

/// Discriminator of a [`Message`], for logs and metric labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Block,
    Transaction,
    Status,
    GetBlockByHash,
    GetBlockByNumber,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Transaction => "transaction",
            Self::Status => "status",
            Self::GetBlockByHash => "get_block_by_hash",
            Self::GetBlockByNumber => "get_block_by_number",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer's announcement of who it is and how far its chain reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub peer_id: PeerId,
    pub protocol_version: u16,
    pub best_block_number: u64,
}

impl Status {
    pub fn new(peer_id: PeerId, protocol_version: u16, best_block_number: u64) -> Self {
        Self {
            peer_id,
            protocol_version,
            best_block_number,
        }
    }
}

//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Using consistent span names and field sets across the codebase makes it
//! easy to filter and correlate traces.

use tracing::{debug_span, info_span, Span};

/// Span covering the handling of a single inbound message.
pub fn message_span(sender: Option<&str>, msg_type: &str) -> Span {
    debug_span!("message", sender = sender.unwrap_or("local"), msg_type = %msg_type)
}

/// Span covering the connection of a single block (and any orphans it frees).
pub fn block_span(block_hash: &str, number: u64) -> Span {
    info_span!("block", hash = %block_hash, number = number)
}

/// Span covering the fan-out of a message to connected peers.
pub fn broadcast_span(msg_type: &str, peer_count: usize) -> Span {
    debug_span!("broadcast", msg_type = %msg_type, peer_count = %peer_count)
}

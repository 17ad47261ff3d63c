//! Callbacks from the transport into the node.

use std::sync::Arc;

use keel_messages::{Message, MessageChannel, Status};
use keel_types::PeerId;

/// Receiver of connection lifecycle and inbound traffic.
///
/// Called from connection tasks on arbitrary runtime threads, so every method
/// must return quickly and never block.
pub trait PeerEvents: Send + Sync + 'static {
    /// The `Status` this node opens every connection with.
    fn local_status(&self) -> Status;

    /// A peer completed the handshake; `channel` reaches it.
    fn peer_connected(&self, peer: PeerId, channel: Arc<dyn MessageChannel>);

    /// A decoded message arrived from `peer`.
    fn message_received(&self, peer: PeerId, message: Message);

    /// The connection to `peer` is gone.
    fn peer_disconnected(&self, peer: PeerId);
}

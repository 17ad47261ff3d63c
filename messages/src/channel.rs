//! Outbound delivery seam between the node and its transports.

use crate::Message;
use keel_types::PeerId;

/// Something that can carry a message to one remote peer.
///
/// `from` is the local node's identity; a transport that frames messages on
/// the wire may ignore it, while in-process channels use it to tell senders
/// apart. Delivery must not block: implementations queue and return.
pub trait MessageChannel: Send + Sync {
    fn deliver(&self, from: PeerId, message: Message);
}

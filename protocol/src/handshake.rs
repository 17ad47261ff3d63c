//! Connection handshake.
//!
//! Each side opens a connection by sending its `Status`. The receiver checks
//! the protocol version and adopts the announced peer id as the identity of
//! the connection.

use crate::{is_compatible, ProtocolError};
use keel_messages::Message;
use keel_types::PeerId;

/// Validate the first message received on a connection.
///
/// Returns the remote peer's id on success.
pub fn check_handshake(first: &Message, our_id: &PeerId) -> Result<PeerId, ProtocolError> {
    let status = match first {
        Message::Status(status) => status,
        other => {
            return Err(ProtocolError::HandshakeFailed(format!(
                "expected status, got {}",
                other.message_type()
            )))
        }
    };

    if !is_compatible(status.protocol_version) {
        return Err(ProtocolError::UnsupportedVersion(status.protocol_version));
    }

    if status.peer_id == *our_id {
        return Err(ProtocolError::HandshakeFailed(
            "connected to ourselves".into(),
        ));
    }

    Ok(status.peer_id)
}

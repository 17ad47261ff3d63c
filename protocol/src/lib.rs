//! Wire protocol: message framing, encoding/decoding, handshake, versioning.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod version;

pub use codec::{decode, encode, read_message, write_message, MAX_MESSAGE_SIZE};
pub use error::ProtocolError;
pub use handshake::check_handshake;
pub use version::{is_compatible, MIN_PROTOCOL_VERSION, PROTOCOL_VERSION};

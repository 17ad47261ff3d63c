//! Fundamental types for the Keel node.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! block and transaction hashes, account addresses, peer identities, timestamps and
//! the network identifier.

pub mod address;
pub mod error;
pub mod hash;
pub mod network;
pub mod peer;
pub mod time;

pub use address::Address;
pub use error::KeelError;
pub use hash::{BlockHash, TxHash};
pub use network::NetworkId;
pub use peer::PeerId;
pub use time::{Clock, SystemClock, Timestamp};

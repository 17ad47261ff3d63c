//! P2P transport for the Keel node.
//!
//! Owns TCP connections only: accepting and dialing peers, exchanging the
//! opening `Status`, framing messages in and out, and telling the node when a
//! peer appears, speaks, or goes away through [`PeerEvents`]. What the node
//! does with those messages is not this crate's concern.

pub mod connection;
pub mod connector;
pub mod error;
pub mod events;
pub mod listener;
pub mod outbound;

pub use connection::run_connection;
pub use connector::connect_to_peer;
pub use error::NetworkError;
pub use events::PeerEvents;
pub use listener::TcpListenerTask;
pub use outbound::OutboundChannel;

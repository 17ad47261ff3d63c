//! Abstract storage traits for the Keel node.
//!
//! Every storage backend (on-disk, in-memory for testing) implements these
//! traits. The node's in-memory chain state is an index over a [`BlockStore`];
//! when and how the backend makes writes durable is the backend's business.

pub mod block;
pub mod error;

pub use block::BlockStore;
pub use error::StoreError;

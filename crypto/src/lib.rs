//! Hashing primitives for the Keel node.
//!
//! - **Blake2b-256** for block and transaction hashes
//! - **Merkle trees** over transaction hashes, committed to in the block hash

pub mod hash;
pub mod merkle;

pub use hash::{blake2b_256, FieldHasher};
pub use merkle::{empty_root, MerkleTree};

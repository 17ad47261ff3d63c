//! Blocks and transactions of the Keel chain.
//!
//! Both are immutable once constructed. Their hashes are derived from their
//! contents at construction time (and again on deserialization), so a hash can
//! never disagree with the data it identifies.

pub mod block;
pub mod error;
pub mod genesis;
pub mod transaction;

pub use block::Block;
pub use error::LedgerError;
pub use genesis::{genesis_block, genesis_hash};
pub use transaction::Transaction;

//! Nullable infrastructure for deterministic testing.
//!
//! The node reaches the outside world through three seams: the clock, the
//! outbound message channel and the block store. This crate provides
//! implementations of each that:
//! - Return deterministic values
//! - Can be controlled and inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod channel;
pub mod clock;
pub mod store;

pub use channel::NullChannel;
pub use clock::NullClock;
pub use store::NullStore;

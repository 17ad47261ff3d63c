//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the primitive types.
#[derive(Debug, Error)]
pub enum KeelError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

//! Blake2b-256 over canonical field encodings.
//!
//! Block and transaction hashes commit to their fields in a fixed order:
//! integers big-endian, fixed-size byte arrays as-is, variable-length data
//! prefixed with its length so adjacent fields cannot run into each other.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Blake2b-256 of `data`.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// Feeds fields into a Blake2b-256 digest in canonical form.
#[derive(Clone, Default)]
pub struct FieldHasher {
    inner: Blake2b256,
}

impl FieldHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed-size bytes, written without a length.
    pub fn fixed(mut self, bytes: &[u8]) -> Self {
        self.inner.update(bytes);
        self
    }

    /// Variable-length bytes, prefixed with their length as a `u64`.
    pub fn var(self, bytes: &[u8]) -> Self {
        self.u64(bytes.len() as u64).fixed(bytes)
    }

    pub fn u64(self, value: u64) -> Self {
        self.fixed(&value.to_be_bytes())
    }

    pub fn u128(self, value: u128) -> Self {
        self.fixed(&value.to_be_bytes())
    }

    pub fn finish(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

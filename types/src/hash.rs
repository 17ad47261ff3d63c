//! Content hashes: [`BlockHash`] and [`TxHash`].
//!
//! Both are 32-byte Blake2b-256 digests that differ only in what they
//! identify, so they share one definition.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::KeelError;

macro_rules! digest_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Parse the 64-character hex form produced by `Display`.
            pub fn from_hex(s: &str) -> Result<Self, KeelError> {
                let bytes = hex::decode(s).map_err(|e| KeelError::InvalidHash(e.to_string()))?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| KeelError::InvalidHash(format!("expected 32 bytes: {s}")))?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}..)", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }
    };
}

digest_type! {
    /// Identifies a block by its content. The genesis block's parent is
    /// [`BlockHash::ZERO`].
    BlockHash
}

digest_type! {
    /// Identifies a transaction by its content.
    TxHash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_names_the_kind_and_abbreviates() {
        let hash = TxHash::new([0xab; 32]);
        assert_eq!(format!("{hash:?}"), "TxHash(abababab..)");
        assert_eq!(format!("{:?}", BlockHash::ZERO), "BlockHash(00000000..)");
    }

    #[test]
    fn default_is_zero() {
        assert!(BlockHash::default().is_zero());
        assert_eq!(TxHash::default(), TxHash::ZERO);
    }

    #[test]
    fn from_hex_reports_bad_input() {
        assert!(matches!(TxHash::from_hex("0g"), Err(KeelError::InvalidHash(_))));
        let short = "ab".repeat(31);
        assert!(matches!(BlockHash::from_hex(&short), Err(KeelError::InvalidHash(_))));
    }
}

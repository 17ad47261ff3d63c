use proptest::prelude::*;

use keel_types::{BlockHash, PeerId, Timestamp, TxHash};

proptest! {
    /// BlockHash::is_zero is true only for all-zero bytes.
    #[test]
    fn block_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// TxHash::is_zero is true only for all-zero bytes.
    #[test]
    fn tx_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// Display output parses back into the same BlockHash.
    #[test]
    fn block_hash_hex_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        let parsed = BlockHash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Display output parses back into the same TxHash.
    #[test]
    fn tx_hash_hex_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(TxHash::from_hex(&hash.to_string()).unwrap(), hash);
    }

    /// PeerId survives the wire encoding used by the transport.
    #[test]
    fn peer_id_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = PeerId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: PeerId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// has_expired agrees with elapsed_since.
    #[test]
    fn timestamp_expiry_consistent(start in 0u64..1_000_000, age in 0u64..1_000_000, ttl in 0u64..1_000_000) {
        let ts = Timestamp::new(start);
        let now = Timestamp::new(start + age);
        prop_assert_eq!(ts.has_expired(ttl, now), ts.elapsed_since(now) >= ttl);
    }
}

#[test]
fn from_hex_rejects_wrong_length() {
    assert!(BlockHash::from_hex("abcd").is_err());
    assert!(BlockHash::from_hex("zz").is_err());
}

//! Value-transfer transactions.

use keel_crypto::FieldHasher;
use keel_types::{Address, TxHash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An immutable transaction. Its identity is [`Transaction::hash`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    fields: TransactionFields,
    hash: TxHash,
}

/// The hashed contents of a transaction, as they travel on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct TransactionFields {
    sender: Address,
    receiver: Address,
    value: u128,
    nonce: u64,
    data: Vec<u8>,
    gas_limit: u64,
    gas_price: u128,
}

impl TransactionFields {
    fn compute_hash(&self) -> TxHash {
        TxHash::new(
            FieldHasher::new()
                .fixed(self.sender.as_bytes())
                .fixed(self.receiver.as_bytes())
                .u128(self.value)
                .u64(self.nonce)
                .var(&self.data)
                .u64(self.gas_limit)
                .u128(self.gas_price)
                .finish(),
        )
    }
}

impl Transaction {
    pub fn new(
        sender: Address,
        receiver: Address,
        value: u128,
        nonce: u64,
        data: Vec<u8>,
        gas_limit: u64,
        gas_price: u128,
    ) -> Self {
        Self::from_fields(TransactionFields {
            sender,
            receiver,
            value,
            nonce,
            data,
            gas_limit,
            gas_price,
        })
    }

    fn from_fields(fields: TransactionFields) -> Self {
        let hash = fields.compute_hash();
        Self { fields, hash }
    }

    /// A copy of this transaction with a different nonce (and therefore a different hash).
    pub fn with_nonce(&self, nonce: u64) -> Self {
        let mut fields = self.fields.clone();
        fields.nonce = nonce;
        Self::from_fields(fields)
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn sender(&self) -> &Address {
        &self.fields.sender
    }

    pub fn receiver(&self) -> &Address {
        &self.fields.receiver
    }

    pub fn value(&self) -> u128 {
        self.fields.value
    }

    pub fn nonce(&self) -> u64 {
        self.fields.nonce
    }

    pub fn data(&self) -> &[u8] {
        &self.fields.data
    }

    pub fn gas_limit(&self) -> u64 {
        self.fields.gas_limit
    }

    pub fn gas_price(&self) -> u128 {
        self.fields.gas_price
    }
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TransactionFields::deserialize(deserializer).map(Self::from_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: u128) -> Transaction {
        Transaction::new(
            Address::new([1u8; 20]),
            Address::new([2u8; 20]),
            value,
            0,
            Vec::new(),
            21_000,
            1,
        )
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(sample(100).hash(), sample(100).hash());
    }

    #[test]
    fn hash_changes_with_value() {
        assert_ne!(sample(100).hash(), sample(101).hash());
    }

    #[test]
    fn with_nonce_rehashes() {
        let tx = sample(100);
        let bumped = tx.with_nonce(7);
        assert_eq!(bumped.nonce(), 7);
        assert_eq!(bumped.value(), 100);
        assert_ne!(bumped.hash(), tx.hash());
    }

    #[test]
    fn data_length_is_part_of_the_hash() {
        let a = Transaction::new(Address::ZERO, Address::ZERO, 0, 0, vec![0], 0, 0);
        let b = Transaction::new(Address::ZERO, Address::ZERO, 0, 0, Vec::new(), 0, 0);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn deserialized_transaction_recomputes_hash() {
        let tx = Transaction::new(
            Address::random(),
            Address::random(),
            5,
            3,
            b"payload".to_vec(),
            60_000,
            2,
        );
        let bytes = bincode::serialize(&tx).unwrap();
        let decoded: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
        assert_eq!(decoded.data(), b"payload");
    }
}

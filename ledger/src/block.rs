//! Chain blocks.

use crate::{LedgerError, Transaction};
use keel_crypto::{FieldHasher, MerkleTree};
use keel_types::{Address, BlockHash, Timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An immutable block.
///
/// The hash commits to every other field; the transaction list enters the
/// hash through the Merkle root of the transaction hashes. Two blocks with the
/// same hash are the same block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    fields: BlockFields,
    hash: BlockHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct BlockFields {
    number: u64,
    parent_hash: BlockHash,
    timestamp: Timestamp,
    coinbase: Address,
    difficulty: u64,
    transactions: Vec<Transaction>,
    state_root: [u8; 32],
}

impl BlockFields {
    fn compute_hash(&self) -> BlockHash {
        let tx_root =
            MerkleTree::from_hashes(self.transactions.iter().map(|tx| *tx.hash().as_bytes()))
                .root();
        BlockHash::new(
            FieldHasher::new()
                .u64(self.number)
                .fixed(self.parent_hash.as_bytes())
                .u64(self.timestamp.as_secs())
                .fixed(self.coinbase.as_bytes())
                .u64(self.difficulty)
                .fixed(&tx_root)
                .fixed(&self.state_root)
                .finish(),
        )
    }
}

impl Block {
    pub fn new(
        number: u64,
        parent_hash: BlockHash,
        timestamp: Timestamp,
        coinbase: Address,
        difficulty: u64,
        transactions: Vec<Transaction>,
        state_root: [u8; 32],
    ) -> Self {
        Self::from_fields(BlockFields {
            number,
            parent_hash,
            timestamp,
            coinbase,
            difficulty,
            transactions,
            state_root,
        })
    }

    /// Build the block that extends `parent` by one, inheriting its difficulty
    /// and state root.
    pub fn child_of(
        parent: &Block,
        timestamp: Timestamp,
        coinbase: Address,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self::new(
            parent.number() + 1,
            parent.hash(),
            timestamp,
            coinbase,
            parent.difficulty(),
            transactions,
            *parent.state_root(),
        )
    }

    fn from_fields(fields: BlockFields) -> Self {
        let hash = fields.compute_hash();
        Self { fields, hash }
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn number(&self) -> u64 {
        self.fields.number
    }

    pub fn parent_hash(&self) -> BlockHash {
        self.fields.parent_hash
    }

    pub fn timestamp(&self) -> Timestamp {
        self.fields.timestamp
    }

    pub fn coinbase(&self) -> &Address {
        &self.fields.coinbase
    }

    pub fn difficulty(&self) -> u64 {
        self.fields.difficulty
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.fields.transactions
    }

    pub fn state_root(&self) -> &[u8; 32] {
        &self.fields.state_root
    }

    /// Genesis is number 0 with the all-zero parent hash.
    pub fn is_genesis(&self) -> bool {
        self.fields.number == 0 && self.fields.parent_hash.is_zero()
    }

    /// Reject blocks whose number and parent hash contradict each other.
    ///
    /// Only a genesis block may have a zero parent, and a genesis block must
    /// be number 0.
    pub fn check_structure(&self) -> Result<(), LedgerError> {
        match (self.fields.number, self.fields.parent_hash.is_zero()) {
            (0, true) => Ok(()),
            (0, false) => Err(LedgerError::InvalidBlock {
                reason: "block number 0 must have a zero parent hash".into(),
            }),
            (_, true) => Err(LedgerError::InvalidBlock {
                reason: format!(
                    "block {} has a zero parent hash but is not genesis",
                    self.fields.number
                ),
            }),
            _ => Ok(()),
        }
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BlockFields::deserialize(deserializer).map(Self::from_fields)
    }
}

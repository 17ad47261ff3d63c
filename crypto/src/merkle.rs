//! Merkle trees over 32-byte hashes.
//!
//! A tree is either a leaf holding a list of hashes or an inner node holding
//! a list of subtrees. Its root is the Blake2b-256 hash of the concatenated
//! child hashes; an empty tree hashes to [`empty_root`].

use crate::hash::{blake2b_256, FieldHasher};
use std::sync::OnceLock;

static EMPTY_ROOT: OnceLock<[u8; 32]> = OnceLock::new();

/// Root of a tree with no children: Blake2b-256 of the empty string.
pub fn empty_root() -> [u8; 32] {
    *EMPTY_ROOT.get_or_init(|| blake2b_256(&[]))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MerkleTree {
    Leaf(Vec<[u8; 32]>),
    Node(Vec<MerkleTree>),
}

impl MerkleTree {
    pub fn from_hashes(hashes: impl IntoIterator<Item = [u8; 32]>) -> Self {
        Self::Leaf(hashes.into_iter().collect())
    }

    pub fn from_nodes(nodes: Vec<MerkleTree>) -> Self {
        Self::Node(nodes)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn root(&self) -> [u8; 32] {
        let children: Vec<[u8; 32]> = match self {
            Self::Leaf(hashes) => hashes.clone(),
            Self::Node(nodes) => nodes.iter().map(MerkleTree::root).collect(),
        };

        if children.is_empty() {
            return empty_root();
        }

        children
            .iter()
            .fold(FieldHasher::new(), |hasher, child| hasher.fixed(child))
            .finish()
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::Leaf(Vec::new())
    }
}

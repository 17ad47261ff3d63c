//! Best-block selection policies.

use keel_ledger::Block;

/// A candidate or current chain head together with its accumulated weight.
#[derive(Clone, Copy, Debug)]
pub struct ChainTip<'a> {
    pub block: &'a Block,
    /// Sum of difficulties from genesis to `block` inclusive.
    pub total_difficulty: u128,
}

/// Decides whether a newly connected block becomes the best block.
///
/// Ties must favour `current`, so the first block seen at a given weight
/// stays best.
pub trait ForkChoice: Send {
    fn prefers(&self, candidate: &ChainTip<'_>, current: &ChainTip<'_>) -> bool;
}

/// The higher block number wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighestNumber;

impl ForkChoice for HighestNumber {
    fn prefers(&self, candidate: &ChainTip<'_>, current: &ChainTip<'_>) -> bool {
        candidate.block.number() > current.block.number()
    }
}

/// The chain with more accumulated difficulty wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaviestDifficulty;

impl ForkChoice for HeaviestDifficulty {
    fn prefers(&self, candidate: &ChainTip<'_>, current: &ChainTip<'_>) -> bool {
        candidate.total_difficulty > current.total_difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_ledger::genesis_block;
    use keel_types::{Address, NetworkId, Timestamp};

    fn tip(block: &Block, total_difficulty: u128) -> ChainTip<'_> {
        ChainTip {
            block,
            total_difficulty,
        }
    }

    #[test]
    fn highest_number_requires_strictly_greater() {
        let genesis = genesis_block(NetworkId::Dev);
        let a = Block::child_of(&genesis, Timestamp::new(1), Address::ZERO, Vec::new());
        let b = Block::child_of(&genesis, Timestamp::new(2), Address::ZERO, Vec::new());

        assert!(HighestNumber.prefers(&tip(&a, 2), &tip(&genesis, 1)));
        assert!(!HighestNumber.prefers(&tip(&b, 2), &tip(&a, 2)));
        assert!(!HighestNumber.prefers(&tip(&genesis, 1), &tip(&a, 2)));
    }

    #[test]
    fn heaviest_difficulty_ignores_number() {
        let genesis = genesis_block(NetworkId::Dev);
        let short_heavy = Block::new(
            1,
            genesis.hash(),
            Timestamp::new(1),
            Address::ZERO,
            100,
            Vec::new(),
            [0; 32],
        );
        let long_light = Block::child_of(&short_heavy, Timestamp::new(2), Address::ZERO, Vec::new());

        assert!(HeaviestDifficulty.prefers(&tip(&short_heavy, 101), &tip(&long_light, 50)));
        assert!(!HeaviestDifficulty.prefers(&tip(&long_light, 101), &tip(&short_heavy, 101)));
    }
}

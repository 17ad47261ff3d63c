//! Hook for the state-transition engine.

use keel_ledger::Block;

/// Decides whether a structurally sound block may join the chain.
///
/// `parent` is the locally known parent, or `None` when the parent has not
/// arrived yet (the block will be buffered as an orphan if accepted) or the
/// block is genesis.
pub trait BlockValidator: Send {
    fn validate(&self, block: &Block, parent: Option<&Block>) -> Result<(), String>;
}

/// Accepts every block.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl BlockValidator for AcceptAll {
    fn validate(&self, _block: &Block, _parent: Option<&Block>) -> Result<(), String> {
        Ok(())
    }
}

impl<F> BlockValidator for F
where
    F: Fn(&Block, Option<&Block>) -> Result<(), String> + Send,
{
    fn validate(&self, block: &Block, parent: Option<&Block>) -> Result<(), String> {
        self(block, parent)
    }
}

//! Routing of inbound messages to the chain, peer and pool components.

use std::ops::RangeInclusive;
use std::sync::Arc;

use keel_ledger::{Block, Transaction};
use keel_messages::{Message, MessageType, Status};
use keel_types::{BlockHash, PeerId};

use crate::block_processor::{BlockProcessor, ProcessResult};
use crate::metrics::NodeMetrics;
use crate::peer_processor::PeerProcessor;
use crate::send_processor::SendProcessor;
use crate::transaction_pool::{TransactionPool, TxAdd};
use crate::validator::BlockValidator;
use crate::NodeError;

/// Dispatches one message at a time.
///
/// `sender` is the peer the message came from, or `None` for a local
/// submission. Blocks and transactions that are new to this node are relayed
/// to every peer except the sender; status reports trigger catch-up requests;
/// block queries are answered when the block is known and ignored otherwise.
pub struct MessageProcessor {
    block_processor: BlockProcessor,
    peer_processor: PeerProcessor,
    transaction_pool: TransactionPool,
    send_processor: SendProcessor,
    validator: Box<dyn BlockValidator>,
    metrics: Arc<NodeMetrics>,
}

impl MessageProcessor {
    pub fn new(
        block_processor: BlockProcessor,
        peer_processor: PeerProcessor,
        transaction_pool: TransactionPool,
        send_processor: SendProcessor,
        validator: Box<dyn BlockValidator>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            block_processor,
            peer_processor,
            transaction_pool,
            send_processor,
            validator,
            metrics,
        }
    }

    pub fn process_message(
        &mut self,
        sender: Option<PeerId>,
        message: Message,
    ) -> Result<(), NodeError> {
        match message {
            Message::Block(block) => self.process_block(sender, block),
            Message::Transaction(tx) => {
                self.process_transaction(sender, tx);
                Ok(())
            }
            Message::Status(status) => {
                let peer = sender.ok_or(NodeError::MissingSender(MessageType::Status))?;
                self.process_status(peer, status);
                Ok(())
            }
            Message::GetBlockByHash(hash) => {
                let peer = sender.ok_or(NodeError::MissingSender(MessageType::GetBlockByHash))?;
                self.process_get_block_by_hash(peer, &hash);
                Ok(())
            }
            Message::GetBlockByNumber(number) => {
                let peer =
                    sender.ok_or(NodeError::MissingSender(MessageType::GetBlockByNumber))?;
                self.process_get_block_by_number(peer, number);
                Ok(())
            }
        }
    }

    fn process_block(&mut self, sender: Option<PeerId>, block: Block) -> Result<(), NodeError> {
        let hash = block.hash();
        let invalid = |reason: String| NodeError::InvalidBlock { hash, reason };

        block.check_structure().map_err(|e| invalid(e.to_string()))?;
        self.block_processor.check_linkage(&block).map_err(invalid)?;
        let parent = self.block_processor.block_by_hash(&block.parent_hash());
        self.validator.validate(&block, parent).map_err(invalid)?;

        let number = block.number();
        match self.block_processor.process_block(block.clone()) {
            ProcessResult::Connected => {
                self.send_processor
                    .broadcast_except(sender.as_ref(), &Message::Block(block));
            }
            ProcessResult::AlreadyKnown => {
                tracing::debug!(%hash, "block already known");
            }
            ProcessResult::Orphan => {
                tracing::debug!(%hash, parent = %block.parent_hash(), "block is an orphan");
            }
        }

        if let Some(peer) = sender {
            let next = self.peer_processor.block_received(&peer, number);
            self.request_blocks(peer, next);
        }
        Ok(())
    }

    fn process_transaction(&mut self, sender: Option<PeerId>, tx: Transaction) {
        match self.transaction_pool.add(tx.clone()) {
            TxAdd::Accepted => {
                self.metrics.transactions_accepted.inc();
                self.metrics
                    .pending_transactions
                    .set(self.transaction_pool.len() as i64);
                self.send_processor
                    .broadcast_except(sender.as_ref(), &Message::Transaction(tx));
            }
            TxAdd::Duplicate => {
                tracing::debug!(hash = %tx.hash(), "transaction already pending");
            }
            TxAdd::Full => {}
        }
    }

    fn process_status(&mut self, peer: PeerId, status: Status) {
        let requests = self
            .peer_processor
            .process_status(peer, status.best_block_number);
        self.request_blocks(peer, requests);
    }

    fn request_blocks(&self, peer: PeerId, numbers: RangeInclusive<u64>) {
        if numbers.is_empty() {
            return;
        }
        tracing::debug!(
            peer = %peer,
            from = numbers.start(),
            to = numbers.end(),
            "requesting blocks"
        );
        for number in numbers {
            self.send_processor
                .send(&peer, Message::GetBlockByNumber(number));
        }
    }

    fn process_get_block_by_hash(&mut self, peer: PeerId, hash: &BlockHash) {
        if let Some(block) = self.block_processor.block_by_hash(hash) {
            self.send_processor.send(&peer, Message::Block(block.clone()));
        }
    }

    fn process_get_block_by_number(&mut self, peer: PeerId, number: u64) {
        if let Some(block) = self.block_processor.block_by_number(number) {
            self.send_processor.send(&peer, Message::Block(block.clone()));
        }
    }

    /// Forget sync state for a peer that went away.
    pub fn peer_disconnected(&mut self, peer: &PeerId) {
        self.peer_processor.remove_peer(peer);
    }

    /// Drop orphans older than `max_age_secs`.
    pub fn prune_orphans(&mut self, max_age_secs: u64) -> usize {
        self.block_processor.prune_orphans(max_age_secs)
    }

    pub fn block_processor(&self) -> &BlockProcessor {
        &self.block_processor
    }

    pub fn peer_processor(&self) -> &PeerProcessor {
        &self.peer_processor
    }

    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.transaction_pool
    }

    pub fn send_processor(&self) -> &SendProcessor {
        &self.send_processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fork_choice::HighestNumber;
    use crate::peer_processor::DEFAULT_MAX_SYNC_BATCH;
    use crate::node_event::EventBus;
    use crate::validator::AcceptAll;
    use keel_ledger::genesis_block;
    use keel_nullables::{NullChannel, NullClock};
    use keel_types::{Address, NetworkId, Timestamp};

    fn local() -> PeerId {
        PeerId::new([0; 32])
    }

    fn peer(byte: u8) -> PeerId {
        PeerId::new([byte; 32])
    }

    fn processor_with(validator: Box<dyn BlockValidator>) -> MessageProcessor {
        processor_with_batch(validator, DEFAULT_MAX_SYNC_BATCH)
    }

    fn processor_with_batch(validator: Box<dyn BlockValidator>, batch: u64) -> MessageProcessor {
        let metrics = Arc::new(NodeMetrics::new());
        let block_processor = BlockProcessor::new(
            16,
            Box::new(HighestNumber),
            Arc::new(NullClock::new(1000)),
            Arc::new(EventBus::new()),
            Arc::clone(&metrics),
        );
        MessageProcessor::new(
            block_processor,
            PeerProcessor::new(batch),
            TransactionPool::new(16),
            SendProcessor::new(local(), Arc::clone(&metrics)),
            validator,
            metrics,
        )
    }

    fn processor() -> MessageProcessor {
        processor_with(Box::new(AcceptAll))
    }

    fn connect(processor: &MessageProcessor, peer: PeerId) -> Arc<NullChannel> {
        let channel = Arc::new(NullChannel::new());
        processor.send_processor().connect_to_peer(peer, channel.clone());
        channel
    }

    #[test]
    fn status_without_sender_is_a_programmer_error() {
        let mut mp = processor();
        let result = mp.process_message(None, Message::Status(Status::new(peer(1), 1, 3)));
        assert!(matches!(
            result,
            Err(NodeError::MissingSender(MessageType::Status))
        ));
        assert!(matches!(
            mp.process_message(None, Message::GetBlockByNumber(0)),
            Err(NodeError::MissingSender(MessageType::GetBlockByNumber))
        ));
        assert!(matches!(
            mp.process_message(None, Message::GetBlockByHash(BlockHash::ZERO)),
            Err(NodeError::MissingSender(MessageType::GetBlockByHash))
        ));
    }

    #[test]
    fn local_block_is_relayed_to_every_peer() {
        let mut mp = processor();
        let a = connect(&mp, peer(1));
        let b = connect(&mp, peer(2));
        let genesis = genesis_block(NetworkId::Dev);

        mp.process_message(None, Message::Block(genesis.clone())).unwrap();

        assert_eq!(a.delivered(), vec![(local(), Message::Block(genesis.clone()))]);
        assert_eq!(b.delivered(), vec![(local(), Message::Block(genesis))]);
    }

    #[test]
    fn structurally_broken_block_is_rejected() {
        let mut mp = processor();
        let channel = connect(&mp, peer(1));
        let broken = keel_ledger::Block::new(
            3,
            BlockHash::ZERO,
            Timestamp::new(1),
            Address::ZERO,
            1,
            Vec::new(),
            [0; 32],
        );

        let result = mp.process_message(Some(peer(2)), Message::Block(broken));
        assert!(matches!(result, Err(NodeError::InvalidBlock { .. })));
        assert!(channel.is_empty());
        assert_eq!(mp.block_processor().block_count(), 0);
    }

    #[test]
    fn block_not_following_parent_number_is_rejected() {
        let mut mp = processor();
        let genesis = genesis_block(NetworkId::Dev);
        mp.process_message(None, Message::Block(genesis.clone())).unwrap();

        let skipping = keel_ledger::Block::new(
            2,
            genesis.hash(),
            Timestamp::new(1),
            Address::ZERO,
            1,
            Vec::new(),
            [0; 32],
        );
        let result = mp.process_message(Some(peer(1)), Message::Block(skipping));
        assert!(matches!(result, Err(NodeError::InvalidBlock { .. })));
    }

    #[test]
    fn second_genesis_cannot_replace_the_root() {
        let mut mp = processor();
        let channel = connect(&mp, peer(1));
        let genesis = genesis_block(NetworkId::Dev);
        mp.process_message(None, Message::Block(genesis.clone())).unwrap();
        channel.reset();

        let fake = keel_ledger::Block::new(
            0,
            BlockHash::ZERO,
            Timestamp::new(99),
            Address::new([3; 20]),
            1_000,
            Vec::new(),
            [0; 32],
        );
        let result = mp.process_message(Some(peer(2)), Message::Block(fake));
        assert!(matches!(
            result,
            Err(NodeError::InvalidBlock { reason, .. }) if reason == "block is not this network's genesis"
        ));
        assert!(channel.is_empty());
        assert_eq!(mp.block_processor().block_by_number(0), Some(&genesis));
    }

    #[test]
    fn validator_sees_parent_and_can_reject() {
        let mut mp = processor_with(Box::new(
            |block: &keel_ledger::Block, parent: Option<&keel_ledger::Block>| {
                if block.is_genesis() {
                    return Ok(());
                }
                match parent {
                    Some(parent) if block.timestamp() > parent.timestamp() => Ok(()),
                    Some(_) => Err("timestamp must increase".to_string()),
                    None => Ok(()),
                }
            },
        ));
        let channel = connect(&mp, peer(1));
        let genesis = genesis_block(NetworkId::Dev);
        mp.process_message(None, Message::Block(genesis.clone())).unwrap();

        let stale = keel_ledger::Block::child_of(&genesis, Timestamp::new(1), Address::ZERO, Vec::new());
        let result = mp.process_message(Some(peer(2)), Message::Block(stale.clone()));
        assert!(matches!(result, Err(NodeError::InvalidBlock { reason, .. }) if reason == "timestamp must increase"));
        assert_eq!(mp.block_processor().block_by_hash(&stale.hash()), None);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn full_pool_does_not_relay() {
        let metrics = Arc::new(NodeMetrics::new());
        let mut mp = MessageProcessor::new(
            BlockProcessor::new(
                16,
                Box::new(HighestNumber),
                Arc::new(NullClock::new(0)),
                Arc::new(EventBus::new()),
                Arc::clone(&metrics),
            ),
            PeerProcessor::new(DEFAULT_MAX_SYNC_BATCH),
            TransactionPool::new(1),
            SendProcessor::new(local(), Arc::clone(&metrics)),
            Box::new(AcceptAll),
            Arc::clone(&metrics),
        );
        let channel = connect(&mp, peer(1));
        let tx = Transaction::new(
            Address::new([1; 20]),
            Address::new([2; 20]),
            5,
            0,
            Vec::new(),
            21_000,
            1,
        );

        mp.process_message(None, Message::Transaction(tx.clone())).unwrap();
        mp.process_message(None, Message::Transaction(tx.with_nonce(1))).unwrap();

        assert_eq!(channel.len(), 1);
        assert_eq!(mp.transaction_pool().len(), 1);
        assert_eq!(metrics.transactions_accepted.get(), 1);
        assert_eq!(metrics.pending_transactions.get(), 1);
        assert!(mp.transaction_pool().full_reported());
    }

    #[test]
    fn disconnected_peer_sync_state_is_forgotten() {
        let mut mp = processor();
        let channel = connect(&mp, peer(1));
        mp.process_message(Some(peer(1)), Message::Status(Status::new(peer(1), 1, 2)))
            .unwrap();
        assert_eq!(channel.len(), 3);

        mp.peer_disconnected(&peer(1));
        assert_eq!(mp.peer_processor().peer_best_block_number(&peer(1)), None);
        assert_eq!(mp.peer_processor().best_block_number(), 2);
    }

    fn requested_numbers(channel: &NullChannel) -> Vec<u64> {
        channel
            .delivered()
            .into_iter()
            .filter_map(|(_, message)| match message {
                Message::GetBlockByNumber(number) => Some(number),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn absurd_status_height_requests_one_bounded_batch() {
        let mut mp = processor();
        let channel = connect(&mp, peer(1));

        mp.process_message(
            Some(peer(1)),
            Message::Status(Status::new(peer(1), 1, u64::MAX)),
        )
        .unwrap();

        let requested = requested_numbers(&channel);
        assert_eq!(requested.len() as u64, DEFAULT_MAX_SYNC_BATCH);
        assert_eq!(requested.first(), Some(&0));
        assert_eq!(requested.last(), Some(&(DEFAULT_MAX_SYNC_BATCH - 1)));
    }

    #[test]
    fn answered_batch_requests_the_next_one() {
        let mut mp = processor_with_batch(Box::new(AcceptAll), 2);
        let channel = connect(&mp, peer(1));
        let genesis = genesis_block(NetworkId::Dev);
        let first = keel_ledger::Block::child_of(&genesis, Timestamp::new(10), Address::ZERO, Vec::new());

        mp.process_message(Some(peer(1)), Message::Status(Status::new(peer(1), 1, 5)))
            .unwrap();
        assert_eq!(requested_numbers(&channel), vec![0, 1]);

        channel.reset();
        mp.process_message(Some(peer(1)), Message::Block(genesis)).unwrap();
        assert!(requested_numbers(&channel).is_empty());

        mp.process_message(Some(peer(1)), Message::Block(first)).unwrap();
        assert_eq!(requested_numbers(&channel), vec![2, 3]);
    }
}

//! Wiring of the engine components and the node's lifecycle.
//!
//! [`NodeBuilder`] assembles every component from a [`NodeConfig`] plus the
//! injected collaborators; [`NodeProcessor`] starts and stops the consumer
//! task and is the entry point for local submissions and observers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use keel_ledger::Block;
use keel_messages::{Message, MessageChannel, Status};
use keel_network::PeerEvents;
use keel_store::BlockStore;
use keel_types::{Clock, PeerId, SystemClock};
use tokio::task::JoinHandle;

use crate::block_processor::BlockProcessor;
use crate::config::NodeConfig;
use crate::fork_choice::{ForkChoice, HighestNumber};
use crate::input_processor::InputProcessor;
use crate::message_processor::MessageProcessor;
use crate::metrics::NodeMetrics;
use crate::node_event::{EventBus, NodeEvent};
use crate::peer_processor::PeerProcessor;
use crate::send_processor::SendProcessor;
use crate::shutdown::ShutdownController;
use crate::transaction_pool::TransactionPool;
use crate::validator::{AcceptAll, BlockValidator};
use crate::NodeError;

/// Collects the collaborators for a node. Anything not supplied gets a
/// default: a random peer id, the wall clock, accept-all validation,
/// highest-number fork choice and no persistent store.
pub struct NodeBuilder {
    config: NodeConfig,
    local_peer: Option<PeerId>,
    validator: Box<dyn BlockValidator>,
    fork_choice: Box<dyn ForkChoice>,
    store: Option<Arc<dyn BlockStore>>,
    clock: Arc<dyn Clock>,
}

impl NodeBuilder {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            local_peer: None,
            validator: Box::new(AcceptAll),
            fork_choice: Box::new(HighestNumber),
            store: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn local_peer(mut self, peer: PeerId) -> Self {
        self.local_peer = Some(peer);
        self
    }

    pub fn validator(mut self, validator: impl BlockValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn fork_choice(mut self, fork_choice: impl ForkChoice + 'static) -> Self {
        self.fork_choice = Box::new(fork_choice);
        self
    }

    pub fn store(mut self, store: Arc<dyn BlockStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the node, restoring chain state from the store if one was given.
    pub fn build(self) -> Result<NodeProcessor, NodeError> {
        let config = self.config;
        let local_peer = self.local_peer.unwrap_or_else(PeerId::random);
        let metrics = Arc::new(NodeMetrics::new());
        let events = Arc::new(EventBus::new());

        let mut block_processor = BlockProcessor::new(
            config.max_orphans,
            self.fork_choice,
            self.clock,
            Arc::clone(&events),
            Arc::clone(&metrics),
        );
        block_processor.set_genesis(keel_ledger::genesis_hash(config.network_id));
        if let Some(store) = self.store {
            block_processor.set_store(store);
            block_processor.load_from_store()?;
        }

        let best_block_number = Arc::new(AtomicU64::new(
            block_processor.best_block_number().unwrap_or(0),
        ));
        {
            let best = Arc::clone(&best_block_number);
            events.subscribe(move |event| {
                if let NodeEvent::NewBestBlock(block) = event {
                    best.store(block.number(), Ordering::Relaxed);
                }
            });
        }

        let send_processor = SendProcessor::new(local_peer, Arc::clone(&metrics));
        let message_processor = MessageProcessor::new(
            block_processor,
            PeerProcessor::new(config.max_sync_batch),
            TransactionPool::new(config.max_pending_transactions),
            send_processor.clone(),
            self.validator,
            Arc::clone(&metrics),
        );
        let input = InputProcessor::new(
            Arc::clone(&events),
            Arc::clone(&metrics),
            config.orphan_max_age_secs,
        );

        tracing::info!(
            peer = %local_peer,
            network = config.network_id.as_str(),
            "node assembled"
        );

        Ok(NodeProcessor {
            config,
            send_processor,
            input,
            events,
            metrics,
            shutdown: ShutdownController::new(),
            best_block_number,
            consumer: Consumer::Idle(message_processor),
        })
    }
}

enum Consumer {
    Idle(MessageProcessor),
    Running(JoinHandle<MessageProcessor>),
    Stopped,
}

pub struct NodeProcessor {
    config: NodeConfig,
    send_processor: SendProcessor,
    input: InputProcessor,
    events: Arc<EventBus>,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
    best_block_number: Arc<AtomicU64>,
    consumer: Consumer,
}

impl NodeProcessor {
    /// A node with default collaborators.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        NodeBuilder::new(config).build()
    }

    pub fn builder(config: NodeConfig) -> NodeBuilder {
        NodeBuilder::new(config)
    }

    /// Spawn the consumer task. Must be called within a tokio runtime.
    /// A node runs at most once.
    pub fn start(&mut self) -> Result<(), NodeError> {
        match std::mem::replace(&mut self.consumer, Consumer::Stopped) {
            Consumer::Idle(processor) => {
                let handle = self.input.spawn(processor, self.shutdown.subscribe());
                self.consumer = Consumer::Running(handle);
                Ok(())
            }
            other => {
                self.consumer = other;
                Err(NodeError::AlreadyStarted)
            }
        }
    }

    /// Stop the consumer after the message in flight and hand back the
    /// processor. Messages still queued are dropped.
    pub async fn stop(&mut self) -> Result<MessageProcessor, NodeError> {
        match std::mem::replace(&mut self.consumer, Consumer::Stopped) {
            Consumer::Running(handle) => {
                self.shutdown.shutdown();
                handle
                    .await
                    .map_err(|e| NodeError::TaskJoin(e.to_string()))
            }
            other => {
                self.consumer = other;
                Err(NodeError::NotStarted)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.consumer, Consumer::Running(_))
    }

    /// Queue a message. `sender` is `None` for local submissions, which are
    /// relayed to every peer.
    pub fn post_message(&self, sender: Option<PeerId>, message: Message) {
        self.input.post_message(sender, message);
    }

    /// Call `callback` with each new best block, on the consumer task.
    pub fn on_new_block(&self, callback: impl Fn(&Block) + Send + Sync + 'static) {
        self.events.subscribe(move |event| {
            if let NodeEvent::NewBestBlock(block) = event {
                callback(block);
            }
        });
    }

    /// Call `callback` whenever the consumer has processed a message and
    /// found the queue empty.
    pub fn on_empty(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.events.subscribe(move |event| {
            if let NodeEvent::QueueEmpty = event {
                callback();
            }
        });
    }

    /// The processor, while the consumer has not been started.
    pub fn message_processor(&self) -> Option<&MessageProcessor> {
        match &self.consumer {
            Consumer::Idle(processor) => Some(processor),
            _ => None,
        }
    }

    pub fn send_processor(&self) -> &SendProcessor {
        &self.send_processor
    }

    pub fn local_peer(&self) -> PeerId {
        self.send_processor.local_peer()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// A handle that stops the consumer when triggered, usable from elsewhere.
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// The `Status` this node announces to peers.
    pub fn local_status(&self) -> Status {
        Status::new(
            self.local_peer(),
            self.config.protocol_version,
            self.best_block_number.load(Ordering::Relaxed),
        )
    }

    /// The transport-facing handle.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            send_processor: self.send_processor.clone(),
            input: self.input.clone(),
            protocol_version: self.config.protocol_version,
            best_block_number: Arc::clone(&self.best_block_number),
        }
    }
}

/// Connects a transport to the node: new peers are registered for outbound
/// delivery, inbound messages are queued, and departed peers are removed.
#[derive(Clone)]
pub struct NodeHandle {
    send_processor: SendProcessor,
    input: InputProcessor,
    protocol_version: u16,
    best_block_number: Arc<AtomicU64>,
}

impl NodeHandle {
    pub fn post_message(&self, sender: Option<PeerId>, message: Message) {
        self.input.post_message(sender, message);
    }
}

impl PeerEvents for NodeHandle {
    fn local_status(&self) -> Status {
        Status::new(
            self.send_processor.local_peer(),
            self.protocol_version,
            self.best_block_number.load(Ordering::Relaxed),
        )
    }

    fn peer_connected(&self, peer: PeerId, channel: Arc<dyn MessageChannel>) {
        tracing::info!(peer = %peer, "peer connected");
        self.send_processor.connect_to_peer(peer, channel);
    }

    fn message_received(&self, peer: PeerId, message: Message) {
        self.input.post_message(Some(peer), message);
    }

    fn peer_disconnected(&self, peer: PeerId) {
        tracing::info!(peer = %peer, "peer disconnected");
        self.send_processor.disconnect_peer(&peer);
        self.input.post_disconnect(peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_ledger::genesis_block;
    use keel_nullables::{NullChannel, NullStore};
    use keel_types::{Address, NetworkId, Timestamp};

    #[test]
    fn builder_defaults_and_overrides() {
        let node = NodeProcessor::builder(NodeConfig::default())
            .local_peer(PeerId::new([4; 32]))
            .build()
            .unwrap();
        assert_eq!(node.local_peer(), PeerId::new([4; 32]));
        assert!(!node.is_running());
        assert_eq!(node.local_status().best_block_number, 0);
        assert!(node.message_processor().is_some());
    }

    #[test]
    fn restored_store_sets_announced_height() {
        let store = Arc::new(NullStore::new());
        let genesis = genesis_block(NetworkId::Dev);
        let one = Block::child_of(&genesis, Timestamp::new(2_000_000_000), Address::ZERO, Vec::new());
        {
            let mut first = NodeProcessor::builder(NodeConfig::default())
                .store(store.clone())
                .build()
                .unwrap();
            let Consumer::Idle(processor) = &mut first.consumer else {
                panic!("fresh node is idle");
            };
            processor.process_message(None, Message::Block(genesis)).unwrap();
            processor.process_message(None, Message::Block(one.clone())).unwrap();
        }

        let node = NodeProcessor::builder(NodeConfig::default())
            .store(store)
            .build()
            .unwrap();
        assert_eq!(node.local_status().best_block_number, 1);
        let processor = node.message_processor().unwrap();
        assert_eq!(processor.block_processor().best_block(), Some(&one));
    }

    #[tokio::test]
    async fn start_and_stop_lifecycle() {
        let mut node = NodeProcessor::new(NodeConfig::default()).unwrap();
        assert!(matches!(node.stop().await, Err(NodeError::NotStarted)));

        node.start().unwrap();
        assert!(matches!(node.start(), Err(NodeError::AlreadyStarted)));
        assert!(node.is_running());

        let processor = node.stop().await.unwrap();
        assert_eq!(processor.block_processor().block_count(), 0);
        assert!(matches!(node.start(), Err(NodeError::AlreadyStarted)));
    }

    #[test]
    fn handle_registers_and_removes_peers() {
        let node = NodeProcessor::new(NodeConfig::default()).unwrap();
        let handle = node.handle();
        let peer = PeerId::new([8; 32]);

        handle.peer_connected(peer, Arc::new(NullChannel::new()));
        assert!(node.send_processor().is_connected(&peer));
        assert_eq!(node.metrics().peer_count.get(), 1);

        handle.message_received(peer, Message::GetBlockByNumber(0));
        handle.peer_disconnected(peer);
        assert!(!node.send_processor().is_connected(&peer));
        assert_eq!(node.input.queue_len(), 2);
        assert_eq!(handle.local_status().peer_id, node.local_peer());
    }
}

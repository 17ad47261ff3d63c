//! Keel node engine: chain sync and gossip.
//!
//! Peers' messages land in an inbound queue drained by a single consumer
//! task. The consumer:
//! - Connects blocks to the local chain, buffering orphans until their
//!   parent arrives
//! - Picks the best chain through a pluggable fork choice rule
//! - Requests missing blocks when a peer reports a longer chain
//! - Pools pending transactions
//! - Relays new blocks and transactions to every other peer

pub mod block_processor;
pub mod config;
pub mod error;
pub mod fork_choice;
pub mod inbound_queue;
pub mod input_processor;
pub mod logging;
pub mod message_processor;
pub mod metrics;
pub mod node_event;
pub mod node_processor;
pub mod orphan_blocks;
pub mod peer_processor;
pub mod send_processor;
pub mod shutdown;
pub mod tracing_spans;
pub mod transaction_pool;
pub mod validator;

pub use block_processor::{BlockProcessor, ProcessResult};
pub use config::NodeConfig;
pub use error::NodeError;
pub use fork_choice::{ChainTip, ForkChoice, HeaviestDifficulty, HighestNumber};
pub use inbound_queue::{Inbound, InboundQueue};
pub use input_processor::InputProcessor;
pub use logging::{init_logging, LogFormat};
pub use message_processor::MessageProcessor;
pub use metrics::NodeMetrics;
pub use node_event::{EventBus, NodeEvent};
pub use node_processor::{NodeBuilder, NodeHandle, NodeProcessor};
pub use orphan_blocks::{OrphanAdd, OrphanBlocks};
pub use peer_processor::PeerProcessor;
pub use send_processor::SendProcessor;
pub use shutdown::ShutdownController;
pub use transaction_pool::{TransactionPool, TxAdd};
pub use validator::{AcceptAll, BlockValidator};

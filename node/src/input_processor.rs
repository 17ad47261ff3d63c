//! The single consumer of the inbound queue.
//!
//! Exactly one task drains the queue and hands each message to the
//! [`MessageProcessor`] it owns, so chain state needs no locking. The task
//! returns the processor when it stops.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use keel_messages::Message;
use keel_types::PeerId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::inbound_queue::{Inbound, InboundQueue};
use crate::message_processor::MessageProcessor;
use crate::metrics::NodeMetrics;
use crate::node_event::{EventBus, NodeEvent};
use crate::shutdown::stopped;
use crate::tracing_spans::message_span;

/// How often expired orphans are swept.
const ORPHAN_PRUNE_INTERVAL: Duration = Duration::from_secs(30);

/// Producer-side handle plus the means to start the consumer.
#[derive(Clone)]
pub struct InputProcessor {
    queue: Arc<InboundQueue>,
    events: Arc<EventBus>,
    metrics: Arc<NodeMetrics>,
    orphan_max_age_secs: u64,
}

impl InputProcessor {
    pub fn new(events: Arc<EventBus>, metrics: Arc<NodeMetrics>, orphan_max_age_secs: u64) -> Self {
        Self {
            queue: Arc::new(InboundQueue::new()),
            events,
            metrics,
            orphan_max_age_secs,
        }
    }

    /// Queue a message for processing. Never blocks.
    pub fn post_message(&self, sender: Option<PeerId>, message: Message) {
        self.post(Inbound::Message { sender, message });
    }

    /// Queue a notice that `peer` went away.
    pub fn post_disconnect(&self, peer: PeerId) {
        self.post(Inbound::PeerDisconnected(peer));
    }

    fn post(&self, item: Inbound) {
        let depth = self.queue.push(item);
        self.metrics.queue_depth.set(depth as i64);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Spawn the consumer task. It runs until the `shutdown` flag is set,
    /// finishing the message in flight and discarding the rest of the queue.
    pub fn spawn(
        &self,
        processor: MessageProcessor,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<MessageProcessor> {
        tokio::spawn(run(self.clone(), processor, shutdown))
    }
}

async fn run(
    input: InputProcessor,
    mut processor: MessageProcessor,
    mut shutdown: watch::Receiver<bool>,
) -> MessageProcessor {
    let mut prune = tokio::time::interval(ORPHAN_PRUNE_INTERVAL);
    prune.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!("input processor started");

    loop {
        let item = tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = prune.tick() => {
                processor.prune_orphans(input.orphan_max_age_secs);
                continue;
            }
            item = input.queue.pop() => item,
        };

        match item {
            Inbound::Message { sender, message } => {
                handle_message(&mut processor, &input.metrics, sender, message);
            }
            Inbound::PeerDisconnected(peer) => processor.peer_disconnected(&peer),
        }

        let depth = input.queue.len();
        input.metrics.queue_depth.set(depth as i64);
        if depth == 0 {
            input.events.emit(&NodeEvent::QueueEmpty);
        }
    }

    let dropped = input.queue.clear();
    input.metrics.messages_dropped.inc_by(dropped as u64);
    input.metrics.queue_depth.set(0);
    tracing::info!(dropped, "input processor stopped");
    processor
}

/// Process one message, containing any error or panic to this message.
fn handle_message(
    processor: &mut MessageProcessor,
    metrics: &NodeMetrics,
    sender: Option<PeerId>,
    message: Message,
) {
    let msg_type = message.message_type();
    let sender_label = sender.map(|peer| peer.to_string());
    let _span = message_span(sender_label.as_deref(), msg_type.as_str()).entered();
    tracing::debug!("processing message");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        processor.process_message(sender, message)
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            metrics.handler_failures.inc();
            tracing::warn!(error = %e, "message handling failed");
        }
        Err(payload) => {
            metrics.handler_failures.inc();
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%reason, "message handler panicked");
        }
    }
    metrics.messages_processed.inc();
}

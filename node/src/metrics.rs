//! Prometheus metrics for the Keel node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] so several nodes
//! can live in one process (as they do in tests) without clashing on metric
//! names.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Messages taken off the inbound queue and dispatched.
    pub messages_processed: IntCounter,
    /// Blocks connected to the local chain (including reattached orphans).
    pub blocks_connected: IntCounter,
    /// Blocks buffered because their parent was unknown.
    pub orphans_buffered: IntCounter,
    /// Orphans refused (buffer full) or expired.
    pub orphans_dropped: IntCounter,
    /// Transactions admitted to the pending pool.
    pub transactions_accepted: IntCounter,
    /// Individual deliveries made to peers.
    pub messages_relayed: IntCounter,
    /// Messages whose handling returned an error or panicked.
    pub handler_failures: IntCounter,
    /// Messages still queued when the node stopped.
    pub messages_dropped: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Number of the current best block.
    pub best_block_number: IntGauge,
    /// Blocks currently waiting for their parent.
    pub orphan_count: IntGauge,
    /// Transactions in the pending pool.
    pub pending_transactions: IntGauge,
    /// Peers registered for outbound delivery.
    pub peer_count: IntGauge,
    /// Messages waiting in the inbound queue.
    pub queue_depth: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name} counter: {e}"))
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name} gauge: {e}"))
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        Self {
            messages_processed: counter(
                &registry,
                "keel_messages_processed_total",
                "Total inbound messages dispatched",
            ),
            blocks_connected: counter(
                &registry,
                "keel_blocks_connected_total",
                "Total blocks connected to the local chain",
            ),
            orphans_buffered: counter(
                &registry,
                "keel_orphans_buffered_total",
                "Total blocks buffered while waiting for their parent",
            ),
            orphans_dropped: counter(
                &registry,
                "keel_orphans_dropped_total",
                "Total orphan blocks refused or expired",
            ),
            transactions_accepted: counter(
                &registry,
                "keel_transactions_accepted_total",
                "Total transactions admitted to the pending pool",
            ),
            messages_relayed: counter(
                &registry,
                "keel_messages_relayed_total",
                "Total messages delivered to peers",
            ),
            handler_failures: counter(
                &registry,
                "keel_handler_failures_total",
                "Total messages whose handling failed",
            ),
            messages_dropped: counter(
                &registry,
                "keel_messages_dropped_total",
                "Total queued messages discarded at shutdown",
            ),
            best_block_number: gauge(
                &registry,
                "keel_best_block_number",
                "Number of the current best block",
            ),
            orphan_count: gauge(
                &registry,
                "keel_orphan_count",
                "Blocks currently waiting for their parent",
            ),
            pending_transactions: gauge(
                &registry,
                "keel_pending_transactions",
                "Transactions in the pending pool",
            ),
            peer_count: gauge(&registry, "keel_peer_count", "Currently connected peers"),
            queue_depth: gauge(
                &registry,
                "keel_queue_depth",
                "Messages waiting in the inbound queue",
            ),
            registry,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

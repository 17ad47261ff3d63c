//! Keel daemon: entry point for running a Keel node.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use keel_ledger::genesis_block;
use keel_messages::Message;
use keel_network::{connect_to_peer, TcpListenerTask};
use keel_node::shutdown::stopped;
use keel_node::{init_logging, NodeConfig, NodeMetrics, NodeProcessor};
use keel_types::NetworkId;

/// How often the metrics summary is logged when metrics are enabled.
const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "keel-daemon", about = "Keel ledger node daemon")]
struct Cli {
    /// Network to join: "live", "test", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "KEEL_NETWORK")]
    network: Option<String>,

    /// Port for P2P connections (defaults to the network's port).
    #[arg(long, env = "KEEL_P2P_PORT")]
    port: Option<u16>,

    /// Bootstrap peer addresses (comma-separated: "1.2.3.4:3000,5.6.7.8:3000").
    #[arg(long, env = "KEEL_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Maximum number of buffered orphan blocks.
    #[arg(long, env = "KEEL_MAX_ORPHANS")]
    max_orphans: Option<usize>,

    /// Maximum number of blocks requested from a peer at once.
    #[arg(long, env = "KEEL_MAX_SYNC_BATCH")]
    max_sync_batch: Option<u64>,

    /// Periodically log node metrics.
    #[arg(long, env = "KEEL_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KEEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "KEEL_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
}

impl Cli {
    /// Layer CLI flags and env vars over the file config (or the defaults).
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => NodeConfig::default(),
        };

        let network_id = self
            .network
            .as_deref()
            .map(NetworkId::parse_or_dev)
            .unwrap_or(base.network_id);
        let listen_port = match (self.port, self.network.is_some()) {
            (Some(port), _) => port,
            (None, true) => network_id.default_port(),
            (None, false) => base.listen_port,
        };

        Ok(NodeConfig {
            network_id,
            listen_port,
            bootstrap_peers: if self.bootstrap_peers.is_empty() {
                base.bootstrap_peers.clone()
            } else {
                self.bootstrap_peers.clone()
            },
            max_orphans: self.max_orphans.unwrap_or(base.max_orphans),
            max_sync_batch: self.max_sync_batch.unwrap_or(base.max_sync_batch),
            enable_metrics: self.metrics || base.enable_metrics,
            log_level: self.log_level.clone().unwrap_or(base.log_level.clone()),
            log_format: self.log_format.clone().unwrap_or(base.log_format.clone()),
            ..base
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    init_logging(config.log_format(), &config.log_level);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Node { action } => match action {
            NodeAction::Run => run_node(config).await,
        },
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    tracing::info!(
        network = config.network_id.as_str(),
        port = config.listen_port,
        "starting Keel node"
    );

    let network_id = config.network_id;
    let listen_addr = format!("0.0.0.0:{}", config.listen_port);
    let bootstrap_peers = config.bootstrap_peers.clone();
    let enable_metrics = config.enable_metrics;

    let mut node = NodeProcessor::new(config)?;
    let shutdown = node.shutdown_controller();
    node.start()?;

    let genesis = genesis_block(network_id);
    tracing::info!(hash = %genesis.hash(), "seeding genesis block");
    node.post_message(None, Message::Block(genesis));

    let listener = TcpListenerTask::bind(&listen_addr)
        .await
        .with_context(|| format!("binding P2P listener on {listen_addr}"))?;
    let handle = Arc::new(node.handle());
    tokio::spawn(listener.run(handle.clone(), shutdown.subscribe()));

    for peer in &bootstrap_peers {
        match connect_to_peer(peer, handle.clone()).await {
            Ok(_) => tracing::info!(%peer, "connected to bootstrap peer"),
            Err(e) => tracing::warn!(%peer, error = %e, "failed to reach bootstrap peer"),
        }
    }

    if enable_metrics {
        let metrics = Arc::clone(node.metrics());
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(METRICS_LOG_INTERVAL);
            loop {
                tokio::select! {
                    _ = stopped(&mut stop) => break,
                    _ = interval.tick() => log_metrics(&metrics),
                }
            }
        });
    }

    shutdown.wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping node");
    let processor = node.stop().await?;

    tracing::info!(
        best = ?processor.block_processor().best_block_number(),
        blocks = processor.block_processor().block_count(),
        "Keel daemon exited cleanly"
    );
    Ok(())
}

fn log_metrics(metrics: &NodeMetrics) {
    tracing::info!(
        best_block = metrics.best_block_number.get(),
        peers = metrics.peer_count.get(),
        queue_depth = metrics.queue_depth.get(),
        orphans = metrics.orphan_count.get(),
        pending_transactions = metrics.pending_transactions.get(),
        processed = metrics.messages_processed.get(),
        "node metrics"
    );
}

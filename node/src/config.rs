//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use keel_protocol::PROTOCOL_VERSION;
use keel_types::NetworkId;

use crate::peer_processor::DEFAULT_MAX_SYNC_BATCH;
use crate::{LogFormat, NodeError};

/// Configuration for a Keel node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to connect to.
    #[serde(default = "default_network")]
    pub network_id: NetworkId,

    /// Protocol version announced in our `Status`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u16,

    /// Port to listen on for P2P connections.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Peer addresses ("ip:port") to dial on startup.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Maximum number of blocks held while waiting for their parent.
    #[serde(default = "default_max_orphans")]
    pub max_orphans: usize,

    /// Orphans older than this are discarded by the periodic prune.
    #[serde(default = "default_orphan_max_age_secs")]
    pub orphan_max_age_secs: u64,

    /// Maximum number of pending transactions. Entries are never removed,
    /// so once the pool is full every further transaction is refused and no
    /// longer relayed until the node restarts.
    #[serde(default = "default_max_pending_transactions")]
    pub max_pending_transactions: usize,

    /// Maximum number of blocks requested from a peer at once. The next
    /// batch is requested when the last block of the current one arrives.
    #[serde(default = "default_max_sync_batch")]
    pub max_sync_batch: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_protocol_version() -> u16 {
    PROTOCOL_VERSION
}

fn default_listen_port() -> u16 {
    NetworkId::Dev.default_port()
}

fn default_max_orphans() -> usize {
    4096
}

fn default_orphan_max_age_secs() -> u64 {
    600
}

fn default_max_pending_transactions() -> usize {
    65_536
}

fn default_max_sync_batch() -> u64 {
    DEFAULT_MAX_SYNC_BATCH
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The parsed log format; anything other than "json" is human-readable.
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_format)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network_id: default_network(),
            protocol_version: default_protocol_version(),
            listen_port: default_listen_port(),
            bootstrap_peers: Vec::new(),
            max_orphans: default_max_orphans(),
            orphan_max_age_secs: default_orphan_max_age_secs(),
            max_pending_transactions: default_max_pending_transactions(),
            max_sync_batch: default_max_sync_batch(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.listen_port, config.listen_port);
        assert_eq!(parsed.max_orphans, config.max_orphans);
        assert_eq!(parsed.max_sync_batch, DEFAULT_MAX_SYNC_BATCH);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.network_id, NetworkId::Dev);
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
        assert_eq!(config.listen_port, 23000);
        assert_eq!(config.max_orphans, 4096);
        assert_eq!(config.orphan_max_age_secs, 600);
        assert_eq!(config.max_pending_transactions, 65_536);
        assert_eq!(config.max_sync_batch, 4096);
        assert_eq!(config.log_format, "human");
        assert!(!config.enable_metrics);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            network_id = "test"
            max_orphans = 16
            max_sync_batch = 128
            bootstrap_peers = ["10.0.0.1:13000"]
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network_id, NetworkId::Test);
        assert_eq!(config.max_orphans, 16);
        assert_eq!(config.max_sync_batch, 128);
        assert_eq!(config.bootstrap_peers, vec!["10.0.0.1:13000".to_string()]);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_port = 4242\nlog_format = \"json\"").unwrap();

        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.listen_port, 4242);
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/keel.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn malformed_toml_returns_config_error() {
        let result = NodeConfig::from_toml_str("max_orphans = \"many\"");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}

//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which Keel network a node is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network.
    Dev,
}

impl NetworkId {
    /// Default P2P port for this network.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 3000,
            Self::Test => 13000,
            Self::Dev => 23000,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }

    /// Parse a network name, falling back to [`NetworkId::Dev`].
    pub fn parse_or_dev(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "live" => Self::Live,
            "test" => Self::Test,
            _ => Self::Dev,
        }
    }
}

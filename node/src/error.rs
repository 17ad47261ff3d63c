use keel_messages::MessageType;
use keel_types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0} message requires a sender")]
    MissingSender(MessageType),

    #[error("invalid block {hash}: {reason}")]
    InvalidBlock { hash: BlockHash, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] keel_store::StoreError),

    #[error("network error: {0}")]
    Network(#[from] keel_network::NetworkError),

    #[error("protocol error: {0}")]
    Protocol(#[from] keel_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node already started")]
    AlreadyStarted,

    #[error("node not started")]
    NotStarted,

    #[error("task join error: {0}")]
    TaskJoin(String),
}

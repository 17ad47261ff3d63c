use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("peer closed the connection")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(#[from] keel_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

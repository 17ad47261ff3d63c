//! Outbound peer connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::connection::spawn_connection;
use crate::{NetworkError, PeerEvents};

/// Timeout for the initial TCP connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Dial `addr` ("ip:port") and spawn the connection task.
///
/// Only the TCP connect is awaited here; the handshake and everything after it
/// run in the returned task.
pub async fn connect_to_peer(
    addr: &str,
    events: Arc<dyn PeerEvents>,
) -> Result<JoinHandle<()>, NetworkError> {
    let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| NetworkError::ConnectionFailed(format!("connection timed out to {addr}")))??;
    let remote = stream.peer_addr()?;
    tracing::debug!(%remote, "outbound connection established");
    Ok(spawn_connection(stream, remote, events))
}

//! A single peer connection: handshake, then read until the peer goes away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keel_messages::Message;
use keel_protocol::{check_handshake, read_message, write_message, ProtocolError};
use keel_types::PeerId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::{NetworkError, OutboundChannel, PeerEvents};

/// Timeout for receiving the remote `Status` after connecting.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Drive one connection to completion.
///
/// Sends the local `Status`, waits for the remote one, registers the peer via
/// [`PeerEvents::peer_connected`] and forwards every decoded message
/// (including the opening `Status`) to [`PeerEvents::message_received`].
/// Frames that fail to decode are skipped; oversized frames and I/O errors end
/// the connection. Once the peer has been announced,
/// [`PeerEvents::peer_disconnected`] is always called on exit.
///
/// Returns the remote peer id after a clean close.
pub async fn run_connection<S>(stream: S, events: Arc<dyn PeerEvents>) -> Result<PeerId, NetworkError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let ours = events.local_status();
    write_message(&mut writer, &Message::Status(ours)).await?;

    let first = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_message(&mut reader)).await {
        Ok(result) => result?.ok_or(NetworkError::Closed)?,
        Err(_) => {
            return Err(NetworkError::Handshake(
                "timed out waiting for status".into(),
            ))
        }
    };
    let peer = check_handshake(&first, &ours.peer_id)
        .map_err(|e| NetworkError::Handshake(e.to_string()))?;

    let (channel, writer_task) = OutboundChannel::spawn(peer, writer);
    let _writer = AbortOnDrop(writer_task);
    events.peer_connected(peer, Arc::new(channel));
    events.message_received(peer, first);

    let result = read_loop(peer, &mut reader, events.as_ref()).await;

    events.peer_disconnected(peer);
    result.map(|()| peer)
}

/// Stops the writer task with the connection, even if the connection task
/// itself is cancelled.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn read_loop<R>(peer: PeerId, reader: &mut R, events: &dyn PeerEvents) -> Result<(), NetworkError>
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_message(reader).await {
            Ok(Some(message)) => events.message_received(peer, message),
            Ok(None) => return Ok(()),
            Err(ProtocolError::Malformed(reason)) => {
                tracing::warn!(peer = %peer, %reason, "discarding malformed message");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Spawn a task running [`run_connection`] over a TCP stream, logging how it
/// ended.
pub fn spawn_connection(
    stream: TcpStream,
    remote: SocketAddr,
    events: Arc<dyn PeerEvents>,
) -> JoinHandle<()> {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(%remote, error = %e, "failed to set TCP_NODELAY");
    }
    tokio::spawn(async move {
        match run_connection(stream, events).await {
            Ok(peer) => {
                tracing::info!(%remote, peer = %peer, "peer disconnected (clean close)");
            }
            Err(e) => {
                tracing::warn!(%remote, error = %e, "peer connection ended with error");
            }
        }
    })
}

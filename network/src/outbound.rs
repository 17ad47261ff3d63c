//! Per-peer outbound queue and the writer task that drains it.

use keel_messages::{Message, MessageChannel};
use keel_protocol::write_message;
use keel_types::PeerId;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The node-facing end of a peer connection.
///
/// Messages are queued on an unbounded channel and written in order by a
/// single writer task, so delivery never blocks the caller and per-peer order
/// is preserved.
pub struct OutboundChannel {
    peer: PeerId,
    tx: mpsc::UnboundedSender<Message>,
}

impl OutboundChannel {
    /// Create a channel for `peer` and spawn the writer that drains it into
    /// `writer`. The writer exits when the channel is dropped or a write fails.
    pub fn spawn<W>(peer: PeerId, writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_loop(peer, writer, rx));
        (Self { peer, tx }, handle)
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Whether the writer task is still accepting messages.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl MessageChannel for OutboundChannel {
    fn deliver(&self, _from: PeerId, message: Message) {
        if self.tx.send(message).is_err() {
            tracing::debug!(peer = %self.peer, "dropping message for closed connection");
        }
    }
}

async fn write_loop<W>(peer: PeerId, mut writer: W, mut rx: mpsc::UnboundedReceiver<Message>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        if let Err(e) = write_message(&mut writer, &message).await {
            tracing::warn!(peer = %peer, error = %e, "failed to write to peer");
            break;
        }
    }
    tracing::debug!(peer = %peer, "writer task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_protocol::read_message;

    #[tokio::test]
    async fn delivered_messages_are_written_in_order() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let peer = PeerId::new([3; 32]);
        let (channel, handle) = OutboundChannel::spawn(peer, client);

        for n in 0..5u64 {
            channel.deliver(PeerId::new([9; 32]), Message::GetBlockByNumber(n));
        }
        drop(channel);
        handle.await.unwrap();

        for n in 0..5u64 {
            let message = read_message(&mut server).await.unwrap();
            assert_eq!(message, Some(Message::GetBlockByNumber(n)));
        }
        assert_eq!(read_message(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delivery_after_writer_exit_is_dropped() {
        let (client, server) = tokio::io::duplex(1024);
        drop(server);
        let (channel, handle) = OutboundChannel::spawn(PeerId::new([4; 32]), client);

        channel.deliver(PeerId::new([9; 32]), Message::GetBlockByNumber(1));
        handle.await.unwrap();

        assert!(!channel.is_open());
        channel.deliver(PeerId::new([9; 32]), Message::GetBlockByNumber(2));
    }
}

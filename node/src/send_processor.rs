//! Peer registry and outbound fan-out.
//!
//! Shared between the transport (which registers and removes peers as
//! connections come and go) and the message consumer (which sends replies and
//! relays). Cloning yields another handle to the same registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keel_messages::{Message, MessageChannel};
use keel_types::PeerId;

use crate::metrics::NodeMetrics;
use crate::tracing_spans::broadcast_span;

type Registry = HashMap<PeerId, Arc<dyn MessageChannel>>;

#[derive(Clone)]
pub struct SendProcessor {
    local_peer: PeerId,
    peers: Arc<RwLock<Registry>>,
    metrics: Arc<NodeMetrics>,
}

impl SendProcessor {
    pub fn new(local_peer: PeerId, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            local_peer,
            peers: Arc::new(RwLock::new(HashMap::new())),
            metrics,
        }
    }

    /// The identity every delivery is tagged with.
    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// Register `channel` for `peer`, replacing any previous channel.
    pub fn connect_to_peer(&self, peer: PeerId, channel: Arc<dyn MessageChannel>) {
        let mut peers = self.write();
        if peers.insert(peer, channel).is_some() {
            tracing::debug!(peer = %peer, "replaced channel for reconnected peer");
        }
        self.metrics.peer_count.set(peers.len() as i64);
    }

    /// Forget `peer`. Returns whether it was registered.
    pub fn disconnect_peer(&self, peer: &PeerId) -> bool {
        let mut peers = self.write();
        let removed = peers.remove(peer).is_some();
        self.metrics.peer_count.set(peers.len() as i64);
        removed
    }

    /// Deliver `message` to `peer` if it is registered.
    pub fn send(&self, peer: &PeerId, message: Message) -> bool {
        let channel = self.read().get(peer).cloned();
        match channel {
            Some(channel) => {
                channel.deliver(self.local_peer, message);
                self.metrics.messages_relayed.inc();
                true
            }
            None => {
                tracing::debug!(peer = %peer, "no channel for peer, message dropped");
                false
            }
        }
    }

    /// Deliver `message` to every registered peer except `excluded`.
    ///
    /// Returns the number of peers the message went to.
    pub fn broadcast_except(&self, excluded: Option<&PeerId>, message: &Message) -> usize {
        let targets: Vec<Arc<dyn MessageChannel>> = self
            .read()
            .iter()
            .filter(|(peer, _)| Some(*peer) != excluded)
            .map(|(_, channel)| Arc::clone(channel))
            .collect();

        let _span = broadcast_span(message.message_type().as_str(), targets.len()).entered();
        for channel in &targets {
            channel.deliver(self.local_peer, message.clone());
        }
        self.metrics.messages_relayed.inc_by(targets.len() as u64);
        targets.len()
    }

    pub fn is_connected(&self, peer: &PeerId) -> bool {
        self.read().contains_key(peer)
    }

    pub fn peer_count(&self) -> usize {
        self.read().len()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.read().keys().copied().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.peers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.peers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_nullables::NullChannel;

    fn peer(byte: u8) -> PeerId {
        PeerId::new([byte; 32])
    }

    fn processor() -> SendProcessor {
        SendProcessor::new(peer(0), Arc::new(NodeMetrics::new()))
    }

    #[test]
    fn send_tags_delivery_with_local_peer() {
        let sp = processor();
        let channel = Arc::new(NullChannel::new());
        sp.connect_to_peer(peer(1), channel.clone());

        assert!(sp.send(&peer(1), Message::GetBlockByNumber(3)));
        assert_eq!(
            channel.delivered(),
            vec![(peer(0), Message::GetBlockByNumber(3))]
        );
    }

    #[test]
    fn send_to_unknown_peer_is_noop() {
        let sp = processor();
        assert!(!sp.send(&peer(9), Message::GetBlockByNumber(0)));
    }

    #[test]
    fn broadcast_skips_excluded_peer() {
        let sp = processor();
        let channels: Vec<Arc<NullChannel>> = (1..=3).map(|_| Arc::new(NullChannel::new())).collect();
        for (i, channel) in channels.iter().enumerate() {
            sp.connect_to_peer(peer(i as u8 + 1), channel.clone());
        }

        let sent = sp.broadcast_except(Some(&peer(2)), &Message::GetBlockByNumber(1));
        assert_eq!(sent, 2);
        assert_eq!(channels[0].len(), 1);
        assert!(channels[1].is_empty());
        assert_eq!(channels[2].len(), 1);

        assert_eq!(sp.broadcast_except(None, &Message::GetBlockByNumber(2)), 3);
        assert_eq!(channels[1].len(), 1);
    }

    #[test]
    fn reconnect_replaces_channel_and_disconnect_removes() {
        let sp = processor();
        let old = Arc::new(NullChannel::new());
        let new = Arc::new(NullChannel::new());
        sp.connect_to_peer(peer(1), old.clone());
        sp.connect_to_peer(peer(1), new.clone());
        assert_eq!(sp.peer_count(), 1);

        sp.send(&peer(1), Message::GetBlockByNumber(0));
        assert!(old.is_empty());
        assert_eq!(new.len(), 1);

        assert!(sp.disconnect_peer(&peer(1)));
        assert!(!sp.disconnect_peer(&peer(1)));
        assert!(!sp.is_connected(&peer(1)));
        assert!(!sp.send(&peer(1), Message::GetBlockByNumber(0)));
    }

    #[test]
    fn registry_is_safe_under_concurrent_changes() {
        let sp = processor();
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let sp = sp.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        sp.connect_to_peer(peer(i + 1), Arc::new(NullChannel::new()));
                        sp.broadcast_except(None, &Message::GetBlockByNumber(0));
                        sp.disconnect_peer(&peer(i + 1));
                    }
                    sp.connect_to_peer(peer(i + 1), Arc::new(NullChannel::new()));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sp.peer_count(), 8);
    }
}

//! Nullable channel: record deliveries instead of sending them.

use keel_messages::{Message, MessageChannel};
use keel_types::PeerId;
use std::sync::Mutex;

/// A peer channel that records every `(from, message)` delivered to it.
#[derive(Debug, Default)]
pub struct NullChannel {
    delivered: Mutex<Vec<(PeerId, Message)>>,
}

impl NullChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<(PeerId, Message)> {
        self.delivered.lock().unwrap().clone()
    }

    /// Only the messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.delivered.lock().unwrap().clear();
    }
}

impl MessageChannel for NullChannel {
    fn deliver(&self, from: PeerId, message: Message) {
        self.delivered.lock().unwrap().push((from, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_delivery_order() {
        let channel = NullChannel::new();
        let from = PeerId::new([1; 32]);
        channel.deliver(from, Message::GetBlockByNumber(1));
        channel.deliver(from, Message::GetBlockByNumber(2));

        assert_eq!(channel.len(), 2);
        assert_eq!(
            channel.messages(),
            vec![Message::GetBlockByNumber(1), Message::GetBlockByNumber(2)]
        );
        assert_eq!(channel.delivered()[0].0, from);

        channel.reset();
        assert!(channel.is_empty());
    }
}

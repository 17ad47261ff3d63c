//! FIFO queue between the transports and the message consumer.
//!
//! Producers call [`push`](InboundQueue::push) from any thread without
//! waiting; the single consumer calls [`pop`](InboundQueue::pop), which
//! `await`s until an item is available.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use keel_messages::Message;
use keel_types::PeerId;
use tokio::sync::Notify;

/// One unit of work for the consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A message from `sender`, or a local submission when `sender` is `None`.
    Message {
        sender: Option<PeerId>,
        message: Message,
    },
    /// A peer's connection closed; its sync state can be dropped.
    PeerDisconnected(PeerId),
}

#[derive(Default)]
pub struct InboundQueue {
    items: Mutex<VecDeque<Inbound>>,
    notify: Notify,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and wake the consumer. Returns the new queue depth.
    pub fn push(&self, item: Inbound) -> usize {
        let depth = {
            let mut items = self.lock();
            items.push_back(item);
            items.len()
        };
        self.notify.notify_one();
        depth
    }

    /// Take the oldest item without waiting.
    pub fn try_pop(&self) -> Option<Inbound> {
        self.lock().pop_front()
    }

    /// Take the oldest item, waiting for a producer if the queue is empty.
    ///
    /// Cancel-safe: an item is only removed once this future completes.
    pub async fn pop(&self) -> Inbound {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    /// Discard everything queued. Returns how many items were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Inbound>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    fn item(n: u64) -> Inbound {
        Inbound::Message {
            sender: None,
            message: Message::GetBlockByNumber(n),
        }
    }

    #[tokio::test]
    async fn items_come_out_in_push_order() {
        let queue = InboundQueue::new();
        assert_eq!(queue.push(item(1)), 1);
        assert_eq!(queue.push(item(2)), 2);
        queue.push(Inbound::PeerDisconnected(PeerId::new([1; 32])));

        assert_eq!(queue.pop().await, item(1));
        assert_eq!(queue.pop().await, item(2));
        assert_eq!(
            queue.pop().await,
            Inbound::PeerDisconnected(PeerId::new([1; 32]))
        );
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(InboundQueue::new());
        let producer = Arc::clone(&queue);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.push(item(9));
        });

        let result = timeout(Duration::from_secs(2), queue.pop()).await;
        assert_eq!(result.unwrap(), item(9));
    }

    #[tokio::test]
    async fn push_before_wait_is_not_lost() {
        let queue = InboundQueue::new();
        queue.push(item(1));
        assert_eq!(queue.try_pop(), Some(item(1)));
        // The stored wake-up permit must not make the next pop return early.
        queue.push(item(2));
        let result = timeout(Duration::from_secs(1), queue.pop()).await;
        assert_eq!(result.unwrap(), item(2));
    }

    #[test]
    fn clear_reports_dropped_count() {
        let queue = InboundQueue::new();
        queue.push(item(1));
        queue.push(item(2));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(InboundQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for n in 0..250 {
                        queue.push(item(t * 1000 + n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 1000);
    }
}

//! In-process bus backed by a tokio broadcast channel.

use ringleader_common::RingleaderError;
use ringleader_common::constants::INBOUND_QUEUE_CAPACITY;
use tokio::sync::{broadcast, mpsc};

use super::{MessageBus, Subscription};

/// Bus shared by several nodes inside one process
#[derive(Clone)]
pub struct MemoryBus {
    sender: broadcast::Sender<Vec<u8>>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Push a raw payload, bypassing any node (used to simulate foreign publishers)
    pub fn inject(&self, payload: impl Into<Vec<u8>>) {
        // No subscribers is not an error for a broadcast medium
        let _ = self.sender.send(payload.into());
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(INBOUND_QUEUE_CAPACITY)
    }
}

impl MessageBus for MemoryBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), RingleaderError> {
        self.inject(payload);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, RingleaderError> {
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Memory bus subscriber lagged, payloads lost");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_every_payload() {
        let bus = MemoryBus::default();
        let mut a = bus.subscribe().await.unwrap();
        let mut b = bus.subscribe().await.unwrap();

        bus.publish(b"one".to_vec()).await.unwrap();
        bus.inject("two");

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.unwrap(), b"one".to_vec());
            assert_eq!(sub.recv().await.unwrap(), b"two".to_vec());
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let bus = MemoryBus::default();
        tokio_test::assert_ok!(bus.publish(b"lost".to_vec()).await);
    }
}

//! Redis pub/sub bus.
//!
//! Publishing goes through a `ConnectionManager` (auto-reconnecting).
//! Subscribing needs a dedicated pub/sub connection; a supervisor task keeps
//! it alive and resubscribes with exponential backoff when it drops.

use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use ringleader_common::RingleaderError;
use ringleader_common::constants::{
    BUS_INITIAL_BACKOFF_MS, BUS_MAX_BACKOFF_MS, INBOUND_QUEUE_CAPACITY,
};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{MessageBus, Subscription};

/// Bus over one Redis pub/sub channel
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
    channel: String,
}

impl RedisBus {
    /// Connect to Redis and bind to `channel`
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, RingleaderError> {
        let client = redis::Client::open(url)
            .map_err(|e| RingleaderError::Bus(format!("invalid Redis URL '{url}': {e}")))?;

        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| RingleaderError::Bus(format!("failed to connect to Redis: {e}")))?;

        let channel = channel.into();
        tracing::info!(channel = %channel, "Redis bus connected");

        Ok(Self {
            client,
            publisher,
            channel,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl MessageBus for RedisBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), RingleaderError> {
        let mut conn = self.publisher.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| RingleaderError::Bus(format!("publish failed: {e}")))?;

        tracing::trace!(channel = %self.channel, receivers, "Published");
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, RingleaderError> {
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);

        // First subscription happens inline so the caller sees setup failures
        let pubsub = open_subscription(&self.client, &self.channel).await?;

        let client = self.client.clone();
        let channel = self.channel.clone();
        tokio::spawn(supervise(client, channel, pubsub, tx));

        Ok(rx)
    }
}

async fn open_subscription(
    client: &redis::Client,
    channel: &str,
) -> Result<redis::aio::PubSub, RingleaderError> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|e| RingleaderError::Bus(format!("pub/sub connection failed: {e}")))?;

    pubsub
        .subscribe(channel)
        .await
        .map_err(|e| RingleaderError::Bus(format!("subscribe to '{channel}' failed: {e}")))?;

    tracing::info!(channel = %channel, "Subscribed");
    Ok(pubsub)
}

/// Forward messages until the receiver goes away, reconnecting on loss
async fn supervise(
    client: redis::Client,
    channel: String,
    first: redis::aio::PubSub,
    tx: mpsc::Sender<Vec<u8>>,
) {
    let initial = Duration::from_millis(BUS_INITIAL_BACKOFF_MS);
    let max = Duration::from_millis(BUS_MAX_BACKOFF_MS);
    let mut backoff = initial;
    let mut current = Some(first);

    loop {
        let pubsub = match current.take() {
            Some(pubsub) => pubsub,
            None => match open_subscription(&client, &channel).await {
                Ok(pubsub) => {
                    backoff = initial;
                    pubsub
                }
                Err(e) => {
                    tracing::warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "Resubscribe failed");
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, max);
                    continue;
                }
            },
        };

        if forward(pubsub, &tx).await {
            tracing::debug!(channel = %channel, "Subscriber dropped, stopping Redis reader");
            return;
        }

        tracing::warn!(channel = %channel, "Redis subscription lost, reconnecting");
        tokio::time::sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, max);
    }
}

/// Pump one subscription. Returns true when the local receiver is gone.
async fn forward(mut pubsub: redis::aio::PubSub, tx: &mpsc::Sender<Vec<u8>>) -> bool {
    let mut messages = pubsub.on_message();

    while let Some(msg) = messages.next().await {
        if tx.send(msg.get_payload_bytes().to_vec()).await.is_err() {
            return true;
        }
    }

    tx.is_closed()
}

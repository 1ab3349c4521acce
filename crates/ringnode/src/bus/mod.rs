//! Broadcast message bus.
//!
//! Every payload published is delivered to every subscriber, the publisher
//! included. No ordering is promised across publishers. Payloads are raw
//! bytes; decoding (and dropping garbage) is the node runtime's job.
//!
//! Implementations:
//! - `RedisBus` - Redis pub/sub on a single channel
//! - `MemoryBus` - in-process broadcast channel for tests and simulations

mod memory;
mod pubsub;

pub use self::memory::MemoryBus;
pub use self::pubsub::RedisBus;

use ringleader_common::RingleaderError;
use std::future::Future;
use tokio::sync::mpsc;

/// Stream of inbound payloads for one subscriber
pub type Subscription = mpsc::Receiver<Vec<u8>>;

/// Shared broadcast channel
pub trait MessageBus: Send + Sync + 'static {
    /// Fire-and-forget publish to every subscriber
    fn publish(&self, payload: Vec<u8>) -> impl Future<Output = Result<(), RingleaderError>> + Send;

    /// Start receiving every payload published from now on
    fn subscribe(&self) -> impl Future<Output = Result<Subscription, RingleaderError>> + Send;
}

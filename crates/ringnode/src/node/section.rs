//! Body of the critical section guarded by the token.

use ringleader_common::NodeId;
use std::future::Future;
use std::time::Duration;

/// Work performed while this node holds the token.
///
/// The runtime only calls `run` while the node holds the token, and passes
/// the token on once the returned future completes.
pub trait CriticalSection: Send + Sync + 'static {
    fn run(&self, holder: NodeId, hold_for: Duration) -> impl Future<Output = ()> + Send;
}

/// Placeholder workload: occupies the resource for the requested time
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedWork;

impl CriticalSection for SimulatedWork {
    async fn run(&self, holder: NodeId, hold_for: Duration) {
        tracing::info!(node = %holder, hold_ms = hold_for.as_millis() as u64, "Entered critical section");
        tokio::time::sleep(hold_for).await;
        tracing::info!(node = %holder, "Leaving critical section");
    }
}

//! Startup harness: decides when this node elects and whether it seeds the token.

use tokio::sync::broadcast;

use crate::config::BootstrapPlan;
use crate::node::NodeHandle;

/// Carry out `plan` against a running node, stopping early on shutdown
pub async fn run(handle: NodeHandle, plan: BootstrapPlan, mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = execute(&handle, &plan) => {}
        _ = shutdown.recv() => {
            tracing::debug!(node = %handle.node_id(), "Bootstrap cancelled");
        }
    }
}

async fn execute(handle: &NodeHandle, plan: &BootstrapPlan) {
    tokio::time::sleep(plan.start_delay).await;

    if plan.elect {
        tracing::info!(node = %handle.node_id(), "Bootstrap: starting election");
        if let Err(e) = handle.start_election().await {
            tracing::error!(error = %e, "Bootstrap election failed");
            return;
        }
    }

    if let Some(after) = plan.seed_token_after {
        tokio::time::sleep(after).await;
        tracing::info!(node = %handle.node_id(), "Bootstrap: seeding token");
        if let Err(e) = handle.seed_token().await {
            tracing::error!(error = %e, "Bootstrap token seeding failed");
        }
    }
}

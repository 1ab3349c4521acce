//! Health and node status endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use ringleader_common::NodeId;
use serde::Serialize;

use crate::diagnostics::LogEntry;
use crate::node::NodeStatus;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current protocol state of this node
pub async fn node_status(
    State(state): State<AppState>,
) -> Result<Json<NodeStatus>, StatusCode> {
    match state.node.status().await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            tracing::warn!(error = %e, "Status requested from stopped node");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

#[derive(Serialize)]
pub struct ClockLogResponse {
    node_id: NodeId,
    entries: Vec<LogEntry>,
    lines: Vec<String>,
}

/// This node's clock log, raw and rendered
pub async fn clock_log(
    State(state): State<AppState>,
) -> Json<ClockLogResponse> {
    let node_id = state.node_id();

    Json(ClockLogResponse {
        node_id,
        entries: state.diagnostics.entries(node_id).await,
        lines: state.diagnostics.render(node_id).await,
    })
}

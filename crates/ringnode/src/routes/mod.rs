//! HTTP status surface for ringnode.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;

/// Create the status router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(health::node_status))
        .route("/log", get(health::clock_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::diagnostics::Diagnostics;
    use crate::node::{CoordinationNode, NodeRuntime, NodeTimings, SimulatedWork};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use ringleader_common::NodeId;
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    async fn app() -> (Router, broadcast::Sender<()>) {
        let (shutdown, _) = broadcast::channel(1);
        let diagnostics = Diagnostics::new();
        let node = CoordinationNode::new(NodeId::new(5), NodeTimings::default());
        let (handle, _task) = NodeRuntime::start(
            node,
            Arc::new(MemoryBus::default()),
            Arc::new(SimulatedWork),
            diagnostics.clone(),
            shutdown.subscribe(),
        )
        .await
        .unwrap();

        (create_router(AppState::new(handle, diagnostics)), shutdown)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _shutdown) = app().await;
        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_reports_node_state() {
        let (app, _shutdown) = app().await;
        let (status, body) = get_json(app, "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node_id"], 5);
        assert_eq!(body["leader"], serde_json::Value::Null);
        assert_eq!(body["holds_token"], false);
        assert_eq!(body["online"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_log_lists_connect_entry() {
        let (app, _shutdown) = app().await;
        let (status, body) = get_json(app, "/log").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node_id"], 5);
        assert_eq!(body["lines"][0], "0.\tConnected");
        assert_eq!(body["entries"][0]["description"], "Connected");
    }

    #[tokio::test]
    async fn test_status_unavailable_after_shutdown() {
        let (app, shutdown) = app().await;
        shutdown.send(()).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let (status, _) = get_json(app, "/status").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

//! # ringnode - Ringleader group member
//!
//! Thin harness around the `ringnode` library: parses the CLI, sets up
//! logging, connects to Redis and runs one node until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ringnode::bus::RedisBus;
use ringnode::cli::Args;
use ringnode::config::AppConfig;
use ringnode::diagnostics::Diagnostics;
use ringnode::node::{CoordinationNode, NodeRuntime, SimulatedWork};
use ringnode::state::AppState;
use ringnode::{bootstrap, routes};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting ringnode v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    let node_id = config.node_id();
    info!(node = %node_id, topic = %config.topic, "Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Connect the bus
    let bus = Arc::new(
        RedisBus::connect(&config.redis_url, config.topic.clone())
            .await
            .context("Failed to connect to Redis bus")?,
    );
    info!("Redis connected: {} (channel {})", config.redis_url, bus.channel());

    // Start the node
    let diagnostics = Diagnostics::new();
    let node = CoordinationNode::new(node_id, config.node_timings());
    let (handle, runtime_task) = NodeRuntime::start(
        node,
        bus,
        Arc::new(SimulatedWork),
        diagnostics.clone(),
        shutdown_tx.subscribe(),
    )
    .await
    .context("Failed to start node runtime")?;

    // Bootstrap harness
    let plan = config.bootstrap.plan(node_id, &mut rand::rng());
    info!(
        start_delay_ms = plan.start_delay.as_millis() as u64,
        elect = plan.elect,
        seed_token = plan.seed_token_after.is_some(),
        "Bootstrap plan"
    );
    tokio::spawn(bootstrap::run(handle.clone(), plan, shutdown_tx.subscribe()));

    // Optional status server
    if let Some(addr) = config.status_addr.clone() {
        let app = routes::create_router(AppState::new(handle.clone(), diagnostics.clone()));
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind status listener on {addr}"))?;
        info!("Status surface listening on {}", addr);

        let mut server_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Status server error");
            }
        });
    }

    // Handle graceful shutdown
    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());

    runtime_task.await.context("Node runtime panicked")?;

    info!("ringnode shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}

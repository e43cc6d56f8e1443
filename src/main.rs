//! ChatHub Server — Real-Time Chat Delivery
//!
//! Main entry point that wires all crates together and starts the server.

mod collaborators;

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use chathub_core::config::AppConfig;
use chathub_core::error::AppError;
use chathub_realtime::{MemoryBroker, RealtimeEngine, RedisBroker, SharedBroker};

use crate::collaborators::{DevTokenVerifier, InMemoryMessageStore};

#[tokio::main]
async fn main() {
    let env = std::env::var("CHATHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ChatHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Connect the broker ───────────────────────────────
    let broker: SharedBroker = match config.broker.provider.as_str() {
        "redis" => {
            tracing::info!(url = %config.broker.url, "Connecting Redis broker...");
            Arc::new(RedisBroker::connect(&config.broker.url, config.broker.subscription_buffer).await?)
        }
        "memory" => {
            tracing::warn!("Using in-process broker; cross-instance relay is disabled");
            Arc::new(MemoryBroker::new(config.broker.subscription_buffer))
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown broker provider '{other}'"
            )));
        }
    };

    // ── Step 2: Start the realtime engine ────────────────────────
    let engine = Arc::new(RealtimeEngine::new(config.realtime.clone(), broker));

    // ── Step 3: Wire collaborators and build the router ──────────
    let state = chathub_api::AppState::new(
        Arc::new(config.clone()),
        engine.clone(),
        Arc::new(DevTokenVerifier),
        Arc::new(InMemoryMessageStore::default()),
    );
    let app = chathub_api::build_router(state);

    // ── Step 4: Serve ────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "ChatHub listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 5: Drain the engine ─────────────────────────────────
    engine.shutdown().await;
    tracing::info!("ChatHub stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {e}");
    }
    tracing::info!("Shutdown signal received");
}

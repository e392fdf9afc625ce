// =============================================================================
// funding-radar — Main Entry Point
// =============================================================================
//
// Polls the Binance USDⓈ-M futures API once a minute, keeps the top
// funding-APR pairs in shared state, and serves them to the dashboard over
// REST and a WebSocket push feed.
// =============================================================================

mod api;
mod app_state;
mod binance;
mod funding;
mod runtime_config;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::funding::run_refresh_cycle;
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        funding-radar — Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("runtime_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    if let Ok(addr) = std::env::var("RADAR_BIND_ADDR") {
        config.bind_addr = addr;
    }

    info!(
        poll_interval_secs = config.poll_interval_secs,
        top_n = config.top_n,
        base_url = %config.base_url,
        "Configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Poll loop ─────────────────────────────────────────────────────
    // The first tick of a tokio interval fires immediately, so the board
    // fills as soon as the service is up.
    let poll_state = state.clone();
    let poll_task = tokio::spawn(async move {
        let period = poll_state.runtime_config.read().poll_interval_secs;
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(period.max(1)));
        loop {
            interval.tick().await;
            run_refresh_cycle(&poll_state).await;
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = state.runtime_config.read().bind_addr.clone();

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    // The repeating poll task is bound to the service lifetime; cancel it
    // so no further cycle can write to state during teardown.
    poll_task.abort();

    if let Err(e) = state.runtime_config.read().save("runtime_config.json") {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("funding-radar shut down complete.");
    Ok(())
}

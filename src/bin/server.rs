//! Failover orchestrator server.
//!
//! Binds the control API and holds the probe resources for the process
//! lifetime. Probes are constructed here, at startup, and dropped on
//! shutdown.

use anyhow::Context;
use failover_core::config::OrchestratorConfig;
use failover_core::logging;
use failover_core::probes::{PgProbe, SentinelClient};
use failover_core::web;
use failover_core::web::state::AppState;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("🚀 Starting failover orchestrator...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(OrchestratorConfig::from_env().context("loading configuration")?);

    let relational = Arc::new(
        PgProbe::new(config.relational_endpoints(), config.probe_timeout)
            .context("building relational probe")?,
    );
    let cache = Arc::new(
        SentinelClient::new(&config.sentinel_endpoints, config.probe_timeout)
            .context("building sentinel client")?,
    );

    let state = AppState::build(Arc::clone(&config), relational, cache)
        .context("assembling orchestrator")?;
    let app = web::create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;

    info!(
        address = %config.bind_address,
        active_region = %config.initial_active_region,
        regions = config.regions.len(),
        "Control API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving control API")?;

    info!("👋 Failover orchestrator shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑 Ctrl+C received, shutting down"),
        _ = terminate => info!("🛑 SIGTERM received, shutting down"),
    }
}

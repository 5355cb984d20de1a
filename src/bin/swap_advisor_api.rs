//! Swap Advisor API Server
//!
//! REST API for route optimization and pre-signing risk scoring
//!
//! Usage:
//!   cargo run --bin swap_advisor_api
//!
//! Environment:
//!   ADVISOR_PORT / PORT     - Server port (default: 3000)
//!   ADVISOR_HOST            - Server host (default: 0.0.0.0)
//!   ADVISOR_POOLS_FILE      - Pool registry JSON (default: built-in)
//!   ADVISOR_REPUTATION_FILE - Reputation table JSON (default: built-in)
//!   ADVISOR_SIGNATURES_FILE - Signature table JSON (default: built-in)
//!   RUST_LOG                - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use swap_advisor::api::{create_router, start_cleanup_task, AppState};
use swap_advisor::{Advisor, AdvisorConfig, AdvisoryTelemetry};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AdvisorConfig::from_env()?;
    let addr: SocketAddr = config.bind_addr().parse()?;

    let advisor = Arc::new(Advisor::from_config(config)?);
    let telemetry = Arc::new(AdvisoryTelemetry::new());
    let telemetry_for_shutdown = Arc::clone(&telemetry);

    let state = Arc::new(AppState::new(advisor, telemetry));

    start_cleanup_task();

    let app = create_router(state);

    info!("🚀 Swap Advisor API starting on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /v1/route           - Best route for a swap");
    info!("  POST /v1/route/impact    - Price impact across amounts");
    info!("  POST /v1/analyze         - Risk assessment of a transaction");
    info!("  POST /v1/address/check   - Reputation check for an address");
    info!("  POST /v1/advise          - Route + transaction + assessment");
    info!("  GET  /v1/stats           - Advisory counters");
    info!("  GET  /v1/health          - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    let stats = telemetry_for_shutdown.get_stats();
    info!(
        "🛑 Shutdown: {} routes, {} assessments, {} errors",
        stats.routes_requested, stats.assessments, stats.errors
    );

    Ok(())
}

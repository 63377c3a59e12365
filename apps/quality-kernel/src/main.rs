// [[QUALITY]]/apps/quality-kernel/src/main.rs
// Purpose: Entry point. Restores persisted metrics before starting the server.
// Architecture: Application Boot
// Dependencies: Axum, Tokio

use quality_kernel::config::DashboardConfig;
use quality_kernel::controller::DashboardController;
use quality_kernel::history::ScoreHistory;
use quality_kernel::observability;
use quality_kernel::server::{self, AppState};
use quality_kernel::store::MetricStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing()?;

    tracing::info!("Initializing quality dashboard kernel...");

    let config = DashboardConfig::from_env()?;

    // === PERSISTENCE RECOVERY ===
    let store = MetricStore::initialize(config.build_storage(), config.namespace.clone(), config.weights);
    let snapshot = store.snapshot();
    tracing::info!(
        "Dashboard ready with overall score {} (history capacity {})",
        snapshot.overall_score,
        config.history_capacity
    );

    let controller = DashboardController::new(store, ScoreHistory::new(config.history_capacity));
    let app = server::router(AppState::new(controller));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Quality dashboard kernel listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Quality dashboard kernel stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

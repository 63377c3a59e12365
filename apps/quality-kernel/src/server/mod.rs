// [[QUALITY]]/apps/quality-kernel/src/server/mod.rs
// Purpose: Loopback HTTP/WS surface for the slider panel and score chart.
// Architecture: API Layer
// Dependencies: Axum, Tower

pub mod handlers;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinError;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::controller::DashboardController;

/// Shared handle to the one controller. Every request holds the mutex for a
/// single synchronous controller call, so mutations apply one at a time.
#[derive(Clone)]
pub struct AppState {
    controller: Arc<Mutex<DashboardController>>,
}

impl AppState {
    pub fn new(controller: DashboardController) -> Self {
        AppState {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn with_controller<R>(&self, f: impl FnOnce(&mut DashboardController) -> R) -> R {
        let mut guard = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Mutations may write to storage synchronously, so they run on the
    /// blocking pool rather than an async worker.
    pub async fn mutate<R, F>(&self, f: F) -> Result<R, JoinError>
    where
        R: Send + 'static,
        F: FnOnce(&mut DashboardController) -> R + Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || state.with_controller(f)).await
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/dashboard/snapshot", get(handlers::get_snapshot))
        .route("/dashboard/history", get(handlers::get_history))
        .route("/dashboard/history/:sequence", get(handlers::get_history_sample))
        .route("/dashboard/metrics/:key", post(handlers::move_slider))
        .route("/dashboard/metrics/:key/lock", post(handlers::toggle_lock))
        .route("/ws/dashboard", get(handlers::ws_dashboard_stream))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

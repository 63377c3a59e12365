// [[QUALITY]]/apps/quality-kernel/src/server/handlers.rs
// Purpose: API Handlers. Translate slider/lock traffic into controller calls.
// Architecture: API Layer
// Dependencies: Axum, Controller

use axum::extract::ws::Message;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Json, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinError;

use super::AppState;
use crate::controller::{DashboardController, SliderOutcome};
use crate::error::DashboardError;
use crate::events::DashboardEvent;
use crate::models::{HistorySample, StoreSnapshot};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub durable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SliderMove {
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderResponse {
    pub accepted: bool,
    pub snapshot: StoreSnapshot,
    pub sample: Option<HistorySample>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub capacity: usize,
    pub samples: Vec<HistorySample>,
}

fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::InvalidKey(_) => StatusCode::NOT_FOUND,
        DashboardError::MetricLocked(_) => StatusCode::CONFLICT,
        DashboardError::InvalidValue => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::PersistenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let durable = state.with_controller(|c| c.is_durable());
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Quality dashboard kernel is running".to_string(),
        durable,
    })
}

pub async fn get_snapshot(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.with_controller(|c| c.snapshot()))
}

pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(state.with_controller(|c| HistoryResponse {
        capacity: c.history().capacity(),
        samples: c.history().samples(),
    }))
}

pub async fn get_history_sample(
    State(state): State<AppState>,
    Path(sequence): Path<u64>,
) -> Result<Json<HistorySample>, StatusCode> {
    state
        .with_controller(|c| c.history().get(sequence).cloned())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn task_failed(e: JoinError) -> Response {
    tracing::error!("Controller task failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "controller task failed" })),
    )
        .into_response()
}

pub async fn move_slider(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SliderMove>,
) -> Response {
    let outcome = match state.mutate(move |c| c.on_slider_moved(&key, body.value)).await {
        Ok(outcome) => outcome,
        Err(e) => return task_failed(e),
    };

    match outcome {
        SliderOutcome::Accepted { snapshot, sample } => Json(SliderResponse {
            accepted: true,
            snapshot,
            sample: Some(sample),
            error: None,
        })
        .into_response(),
        SliderOutcome::Rejected { reason, snapshot } => (
            status_for(&reason),
            Json(SliderResponse {
                accepted: false,
                snapshot,
                sample: None,
                error: Some(reason.to_string()),
            }),
        )
            .into_response(),
    }
}

pub async fn toggle_lock(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.mutate(move |c| c.on_lock_toggled(&key)).await {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => task_failed(e),
    }
}

pub async fn ws_dashboard_stream(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_dashboard_stream(socket, state))
}

fn snapshot_frame(snapshot: &StoreSnapshot, history: &[HistorySample], durable: bool) -> String {
    json!({
        "type": "snapshot",
        "snapshot": snapshot,
        "history": history,
        "durable": durable,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
    .to_string()
}

fn current_snapshot_frame(controller: &DashboardController) -> String {
    snapshot_frame(
        &controller.snapshot(),
        &controller.history().samples(),
        controller.is_durable(),
    )
}

/// Frame to push for one bus receive. A lagged client gets the whole state
/// again; `None` ends the stream.
fn frame_for(state: &AppState, received: Result<DashboardEvent, RecvError>) -> Option<String> {
    match received {
        Ok(event) => Some(json!({ "type": "event", "event": event }).to_string()),
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!("Dashboard stream lagged by {} events, resending snapshot", skipped);
            Some(state.with_controller(|c| current_snapshot_frame(c)))
        }
        Err(RecvError::Closed) => None,
    }
}

async fn handle_dashboard_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe under the same lock as the snapshot read so no change falls between them.
    let (mut events, initial) =
        state.with_controller(|c| (c.subscribe(), current_snapshot_frame(c)));

    if sender.send(Message::Text(initial)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                        tracing::info!("Client disconnected from dashboard stream");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            event = events.recv() => {
                let Some(frame) = frame_for(&state, event) else {
                    break;
                };

                if sender.send(Message::Text(frame)).await.is_err() {
                    tracing::info!("Failed to send dashboard update, client disconnected");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    use crate::history::ScoreHistory;
    use crate::models::ScoreWeights;
    use crate::storage::MemoryStorage;
    use crate::store::{MetricStore, DEFAULT_NAMESPACE};

    fn state_over(storage: &MemoryStorage) -> AppState {
        let store = MetricStore::initialize(
            Box::new(storage.clone()),
            DEFAULT_NAMESPACE,
            ScoreWeights::default(),
        );
        AppState::new(DashboardController::new(store, ScoreHistory::new(50)))
    }

    fn parse(frame: Option<String>) -> Value {
        serde_json::from_str(&frame.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_lagged_stream_gets_fresh_snapshot() {
        let state = state_over(&MemoryStorage::new());
        let mut events = state.with_controller(|c| c.subscribe());

        // Overrun the bus so the receiver falls behind.
        state.with_controller(|c| {
            for i in 0..150 {
                c.on_slider_moved("agent_empathy", (i % 100) as f64);
            }
        });

        let received = events.recv().await;
        assert!(matches!(received, Err(RecvError::Lagged(_))));

        let frame = parse(frame_for(&state, received));
        assert_eq!(frame["type"], "snapshot");
        assert_eq!(frame["durable"], true);
        assert_eq!(frame["snapshot"]["metrics"]["agent_empathy"]["value"], 49);
        assert_eq!(frame["history"].as_array().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_event_frame_wraps_event() {
        let state = state_over(&MemoryStorage::new());
        let mut events = state.with_controller(|c| c.subscribe());
        state.with_controller(|c| c.on_slider_moved("customer_satisfaction", 70.0));

        let frame = parse(frame_for(&state, events.recv().await));
        assert_eq!(frame["type"], "event");
        assert_eq!(frame["event"]["eventType"], "metric_committed");
        assert_eq!(frame["event"]["metric"], "customer_satisfaction");
    }

    #[test]
    fn test_closed_bus_ends_stream() {
        let state = state_over(&MemoryStorage::new());
        assert!(frame_for(&state, Err(RecvError::Closed)).is_none());
    }
}

// [[QUALITY]]/apps/quality-kernel/src/events.rs
// Purpose: Notifications fanned out to the slider panel and score chart.
// Architecture: Domain Event Layer
// Dependencies: Serde, Chrono, Uuid

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{MetricKey, StoreSnapshot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A slider move was accepted and a history sample recorded
    MetricCommitted,
    /// A slider move was refused; the slider must snap back to the snapshot
    SliderRejected,
    /// A metric's edit lock flipped
    LockToggled,
    /// Storage failed; changes are no longer durable for this session
    PersistenceDegraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEvent {
    pub id: String,
    pub event_type: EventType,
    pub metric: Option<MetricKey>,
    pub timestamp: String,
    pub snapshot: StoreSnapshot,
    pub payload: Value,
}

impl DashboardEvent {
    pub fn new(
        event_type: EventType,
        metric: Option<MetricKey>,
        snapshot: StoreSnapshot,
        payload: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            metric,
            timestamp: Utc::now().to_rfc3339(),
            snapshot,
            payload,
        }
    }
}

// [[QUALITY]]/apps/quality-kernel/src/controller.rs
// Purpose: Sequences UI events into store mutations and fans the result out.
// Architecture: Domain Logic Layer
// Dependencies: tokio broadcast, store, history

use serde_json::json;
use tokio::sync::broadcast;

use crate::error::DashboardError;
use crate::events::{DashboardEvent, EventType};
use crate::history::ScoreHistory;
use crate::models::{HistorySample, MetricKey, StoreSnapshot};
use crate::store::MetricStore;

const EVENT_BUFFER: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum SliderOutcome {
    Accepted {
        snapshot: StoreSnapshot,
        sample: HistorySample,
    },
    /// The slider must render `snapshot`, not the attempted position.
    Rejected {
        reason: DashboardError,
        snapshot: StoreSnapshot,
    },
}

impl SliderOutcome {
    pub fn snapshot(&self) -> &StoreSnapshot {
        match self {
            SliderOutcome::Accepted { snapshot, .. } | SliderOutcome::Rejected { snapshot, .. } => {
                snapshot
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SliderOutcome::Accepted { .. })
    }
}

pub struct DashboardController {
    store: MetricStore,
    history: ScoreHistory,
    event_bus: broadcast::Sender<DashboardEvent>,
    /// Startup fault held back until someone is listening.
    startup_fault: Option<DashboardError>,
}

impl DashboardController {
    pub fn new(mut store: MetricStore, history: ScoreHistory) -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        let startup_fault = store.take_persistence_fault();
        if let Some(fault) = &startup_fault {
            tracing::error!("Dashboard changes are not durable this session: {}", fault);
        }

        DashboardController {
            store,
            history,
            event_bus: tx,
            startup_fault,
        }
    }

    /// The first subscriber also receives any persistence fault hit while
    /// restoring state.
    pub fn subscribe(&mut self) -> broadcast::Receiver<DashboardEvent> {
        let rx = self.event_bus.subscribe();
        if let Some(fault) = self.startup_fault.take() {
            self.emit_degraded(&fault);
        }
        rx
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_durable()
    }

    fn emit_event(&self, event: DashboardEvent) {
        // No subscribers is fine; collaborators pull on connect.
        let _ = self.event_bus.send(event);
    }

    fn emit_degraded(&self, fault: &DashboardError) {
        self.emit_event(DashboardEvent::new(
            EventType::PersistenceDegraded,
            None,
            self.store.snapshot(),
            json!({ "reason": fault.to_string() }),
        ));
    }

    fn report_persistence_fault(&mut self) {
        if let Some(fault) = self.store.take_persistence_fault() {
            tracing::error!("Dashboard changes are no longer durable: {}", fault);
            self.emit_degraded(&fault);
        }
    }

    pub fn on_slider_moved(&mut self, key: &str, value: f64) -> SliderOutcome {
        let trigger: MetricKey = match key.parse() {
            Ok(k) => k,
            Err(reason) => return self.reject(key, reason),
        };

        let outcome = match self.store.set_value(trigger.as_str(), value) {
            Ok(snapshot) => {
                let sample =
                    HistorySample::from_snapshot(self.history.next_sequence(), trigger, &snapshot);
                self.history.record(sample.clone());

                self.emit_event(DashboardEvent::new(
                    EventType::MetricCommitted,
                    Some(trigger),
                    snapshot.clone(),
                    json!({ "sample": sample }),
                ));
                SliderOutcome::Accepted { snapshot, sample }
            }
            Err(reason) => self.reject(key, reason),
        };

        self.report_persistence_fault();
        outcome
    }

    fn reject(&self, key: &str, reason: DashboardError) -> SliderOutcome {
        tracing::warn!("Rejected slider move on {}: {}", key, reason);
        let snapshot = self.store.snapshot();

        self.emit_event(DashboardEvent::new(
            EventType::SliderRejected,
            key.parse().ok(),
            snapshot.clone(),
            json!({ "reason": reason.to_string() }),
        ));
        SliderOutcome::Rejected { reason, snapshot }
    }

    /// Flips the edit lock. Does not record a history sample.
    pub fn on_lock_toggled(&mut self, key: &str) -> Result<StoreSnapshot, DashboardError> {
        let locked = !self.store.is_locked(key)?;
        let snapshot = self.store.set_locked(key, locked)?;

        self.emit_event(DashboardEvent::new(
            EventType::LockToggled,
            key.parse().ok(),
            snapshot.clone(),
            json!({ "locked": locked }),
        ));

        self.report_persistence_fault();
        Ok(snapshot)
    }
}

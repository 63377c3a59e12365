// [[QUALITY]]/apps/quality-kernel/src/store.rs
// Purpose: Single source of truth for the three ticket metrics and the derived score.
// Architecture: Domain Logic Layer
// Dependencies: serde_json, storage

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DashboardError;
use crate::models::*;
use crate::storage::{KeyValueStorage, StorageError};

pub const DEFAULT_NAMESPACE: &str = "ticket_quality";

/// On-disk shape of one metric entry.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedMetric {
    value: i64,
    locked: bool,
}

pub struct MetricStore {
    metrics: BTreeMap<MetricKey, Metric>,
    overall_score: u8,
    weights: ScoreWeights,
    namespace: String,
    storage: Box<dyn KeyValueStorage>,
    durable: bool,
    pending_fault: Option<DashboardError>,
}

impl MetricStore {
    /// Restores persisted metrics, falling back to defaults per key.
    /// Never fails: a storage read error leaves the store running in memory.
    pub fn initialize(
        storage: Box<dyn KeyValueStorage>,
        namespace: impl Into<String>,
        weights: ScoreWeights,
    ) -> Self {
        let mut store = MetricStore {
            metrics: MetricKey::ALL
                .into_iter()
                .map(|k| (k, Metric::default()))
                .collect(),
            overall_score: DEFAULT_METRIC_VALUE,
            weights,
            namespace: namespace.into(),
            storage,
            durable: true,
            pending_fault: None,
        };

        match store.load_persisted() {
            Ok(restored) => {
                tracing::info!(
                    "Restored {} of {} metrics from storage",
                    restored.len(),
                    MetricKey::ALL.len()
                );
                store.metrics.extend(restored);
            }
            Err(e) => store.degrade(e),
        }

        store.recompute();
        store
    }

    fn entry_key(&self, key: MetricKey) -> String {
        format!("{}.{}", self.namespace, key)
    }

    /// Reads every entry first so an I/O failure midway restores nothing.
    fn load_persisted(&self) -> Result<BTreeMap<MetricKey, Metric>, StorageError> {
        let mut restored = BTreeMap::new();

        for key in MetricKey::ALL {
            let Some(raw) = self.storage.get(&self.entry_key(key))? else {
                tracing::debug!("No persisted entry for {}, using default", key);
                continue;
            };

            match parse_entry(&raw) {
                Some(metric) => {
                    restored.insert(key, metric);
                }
                None => {
                    tracing::warn!("Discarding corrupt persisted entry for {}: {}", key, raw);
                }
            }
        }

        Ok(restored)
    }

    fn persist(&mut self) {
        if !self.durable {
            return;
        }
        if let Err(e) = self.write_all() {
            self.degrade(e);
        }
    }

    fn write_all(&mut self) -> Result<(), StorageError> {
        for key in MetricKey::ALL {
            let metric = self.metrics.get(&key).copied().unwrap_or_default();
            let json = serde_json::to_string(&PersistedMetric {
                value: i64::from(metric.value),
                locked: metric.locked,
            })?;
            let entry_key = self.entry_key(key);
            self.storage.set(&entry_key, &json)?;
        }
        Ok(())
    }

    /// Switches to in-memory operation for the rest of the session.
    fn degrade(&mut self, e: StorageError) {
        tracing::error!("Persistence unavailable, continuing in memory only: {}", e);
        self.durable = false;
        self.pending_fault = Some(e.into());
    }

    fn recompute(&mut self) {
        self.overall_score = self.weights.overall_score(&self.metrics);
    }

    /// Clamps `raw` into `[0, 100]` (rounding half away from zero) and commits it.
    pub fn set_value(&mut self, key: &str, raw: f64) -> Result<StoreSnapshot, DashboardError> {
        let key: MetricKey = key.parse()?;

        let metric = self.metrics.entry(key).or_default();
        if metric.locked {
            return Err(DashboardError::MetricLocked(key));
        }
        if raw.is_nan() {
            return Err(DashboardError::InvalidValue);
        }

        metric.value = raw
            .round()
            .clamp(f64::from(METRIC_MIN), f64::from(METRIC_MAX)) as u8;
        let value = metric.value;

        self.recompute();
        self.persist();

        tracing::debug!(
            "Committed {} = {} (overall score {})",
            key,
            value,
            self.overall_score
        );
        Ok(self.snapshot())
    }

    /// Sets the edit lock. Idempotent; never touches values or the score.
    pub fn set_locked(&mut self, key: &str, locked: bool) -> Result<StoreSnapshot, DashboardError> {
        let key: MetricKey = key.parse()?;

        self.metrics.entry(key).or_default().locked = locked;
        self.persist();

        tracing::debug!("Metric {} locked = {}", key, locked);
        Ok(self.snapshot())
    }

    pub fn is_locked(&self, key: &str) -> Result<bool, DashboardError> {
        let key: MetricKey = key.parse()?;
        Ok(self.metrics.get(&key).map(|m| m.locked).unwrap_or(false))
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            metrics: self.metrics.clone(),
            overall_score: self.overall_score,
        }
    }

    pub fn overall_score(&self) -> u8 {
        self.overall_score
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Yields the persistence failure once; later calls return `None`.
    pub fn take_persistence_fault(&mut self) -> Option<DashboardError> {
        self.pending_fault.take()
    }
}

fn parse_entry(raw: &str) -> Option<Metric> {
    let entry: PersistedMetric = serde_json::from_str(raw).ok()?;
    let value = u8::try_from(entry.value).ok().filter(|v| *v <= METRIC_MAX)?;
    Some(Metric {
        value,
        locked: entry.locked,
    })
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, DashboardError};

pub const METRIC_MIN: u8 = 0;
pub const METRIC_MAX: u8 = 100;
pub const DEFAULT_METRIC_VALUE: u8 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    CustomerSatisfaction,
    AgentEmpathy,
    TimeToResolution,
}

impl MetricKey {
    pub const ALL: [MetricKey; 3] = [
        MetricKey::CustomerSatisfaction,
        MetricKey::AgentEmpathy,
        MetricKey::TimeToResolution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::CustomerSatisfaction => "customer_satisfaction",
            MetricKey::AgentEmpathy => "agent_empathy",
            MetricKey::TimeToResolution => "time_to_resolution",
        }
    }

    fn index(self) -> usize {
        match self {
            MetricKey::CustomerSatisfaction => 0,
            MetricKey::AgentEmpathy => 1,
            MetricKey::TimeToResolution => 2,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DashboardError::InvalidKey(s.to_string()))
    }
}

/// One tracked ticket-quality dimension. `value` stays in `[0, 100]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metric {
    pub value: u8,
    pub locked: bool,
}

impl Default for Metric {
    fn default() -> Self {
        Metric {
            value: DEFAULT_METRIC_VALUE,
            locked: false,
        }
    }
}

/// Immutable view handed to render collaborators after every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub metrics: BTreeMap<MetricKey, Metric>,
    pub overall_score: u8,
}

impl StoreSnapshot {
    pub fn metric(&self, key: MetricKey) -> Metric {
        self.metrics.get(&key).copied().unwrap_or_default()
    }

    pub fn value(&self, key: MetricKey) -> u8 {
        self.metric(key).value
    }

    pub fn is_locked(&self, key: MetricKey) -> bool {
        self.metric(key).locked
    }
}

/// One point on the score-over-time chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
    pub sequence: u64,
    pub timestamp: String,
    pub overall_score: u8,
    /// Metric whose committed change produced this sample.
    pub trigger: MetricKey,
    pub metric_snapshot: BTreeMap<MetricKey, u8>,
}

impl HistorySample {
    pub fn from_snapshot(sequence: u64, trigger: MetricKey, snapshot: &StoreSnapshot) -> Self {
        HistorySample {
            sequence,
            timestamp: chrono::Utc::now().to_rfc3339(),
            overall_score: snapshot.overall_score,
            trigger,
            metric_snapshot: snapshot
                .metrics
                .iter()
                .map(|(key, metric)| (*key, metric.value))
                .collect(),
        }
    }
}

/// Relative weight of each metric in the overall score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    weights: [f64; 3],
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            weights: [1.0, 1.0, 1.0],
        }
    }
}

impl ScoreWeights {
    /// Weights are given in `MetricKey::ALL` order.
    pub fn new(
        customer_satisfaction: f64,
        agent_empathy: f64,
        time_to_resolution: f64,
    ) -> Result<Self, ConfigError> {
        let weights = [customer_satisfaction, agent_empathy, time_to_resolution];

        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ConfigError::InvalidWeights(format!(
                "weight {} must be finite and non-negative",
                bad
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }

        Ok(ScoreWeights { weights })
    }

    pub fn weight(&self, key: MetricKey) -> f64 {
        self.weights[key.index()]
    }

    /// Weighted mean of the metric values, rounded half away from zero.
    /// Locked metrics still count.
    pub fn overall_score(&self, metrics: &BTreeMap<MetricKey, Metric>) -> u8 {
        let total: f64 = MetricKey::ALL.iter().map(|k| self.weight(*k)).sum();
        let weighted: f64 = MetricKey::ALL
            .iter()
            .map(|k| {
                let value = metrics.get(k).copied().unwrap_or_default().value;
                self.weight(*k) * f64::from(value)
            })
            .sum();

        (weighted / total)
            .round()
            .clamp(f64::from(METRIC_MIN), f64::from(METRIC_MAX)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cs: u8, ae: u8, ttr: u8) -> BTreeMap<MetricKey, Metric> {
        [
            (MetricKey::CustomerSatisfaction, cs),
            (MetricKey::AgentEmpathy, ae),
            (MetricKey::TimeToResolution, ttr),
        ]
        .into_iter()
        .map(|(k, value)| (k, Metric { value, locked: false }))
        .collect()
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            "agent_empathy".parse::<MetricKey>().unwrap(),
            MetricKey::AgentEmpathy
        );
        assert_eq!(
            "Agent_Empathy".parse::<MetricKey>(),
            Err(DashboardError::InvalidKey("Agent_Empathy".to_string()))
        );
    }

    #[test]
    fn test_key_serializes_as_wire_name() {
        let json = serde_json::to_string(&MetricKey::TimeToResolution).unwrap();
        assert_eq!(json, "\"time_to_resolution\"");
    }

    #[test]
    fn test_equal_weight_mean() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.overall_score(&metrics(60, 80, 40)), 60);
        assert_eq!(weights.overall_score(&metrics(50, 50, 50)), 50);
        assert_eq!(weights.overall_score(&metrics(0, 0, 1)), 0);
        assert_eq!(weights.overall_score(&metrics(100, 100, 99)), 100);
    }

    #[test]
    fn test_mean_rounds_half_away_from_zero() {
        let weights = ScoreWeights::new(1.0, 1.0, 0.0).unwrap();
        // (50 + 51) / 2 = 50.5
        assert_eq!(weights.overall_score(&metrics(50, 51, 0)), 51);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoreWeights::new(2.0, 1.0, 1.0).unwrap();
        // (2*100 + 0 + 0) / 4 = 50
        assert_eq!(weights.overall_score(&metrics(100, 0, 0)), 50);
    }

    #[test]
    fn test_invalid_weights() {
        assert!(ScoreWeights::new(-1.0, 1.0, 1.0).is_err());
        assert!(ScoreWeights::new(0.0, 0.0, 0.0).is_err());
        assert!(ScoreWeights::new(f64::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_sample_captures_values() {
        let snapshot = StoreSnapshot {
            metrics: metrics(10, 20, 30),
            overall_score: 20,
        };
        let sample = HistorySample::from_snapshot(7, MetricKey::AgentEmpathy, &snapshot);

        assert_eq!(sample.sequence, 7);
        assert_eq!(sample.overall_score, 20);
        assert_eq!(sample.metric_snapshot[&MetricKey::TimeToResolution], 30);
    }
}

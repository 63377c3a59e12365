use thiserror::Error;

use crate::models::MetricKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Unknown metric key: {0}")]
    InvalidKey(String),
    #[error("Metric {0} is locked")]
    MetricLocked(MetricKey),
    #[error("Metric value is not a number")]
    InvalidValue,
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Invalid score weights: {0}")]
    InvalidWeights(String),
}

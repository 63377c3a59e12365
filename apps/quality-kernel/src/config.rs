// [[QUALITY]]/apps/quality-kernel/src/config.rs
// Purpose: Process configuration from environment variables with local defaults.
// Architecture: Application Boot
// Dependencies: std::env

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::models::ScoreWeights;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::store::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    File,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub state_dir: PathBuf,
    pub namespace: String,
    pub history_capacity: usize,
    pub weights: ScoreWeights,
    pub persistence: PersistenceMode,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            state_dir: PathBuf::from(".quality-dashboard"),
            namespace: DEFAULT_NAMESPACE.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            weights: ScoreWeights::default(),
            persistence: PersistenceMode::File,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DashboardConfig::default();

        if let Some(host) = lookup("DASHBOARD_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DASHBOARD_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "DASHBOARD_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = lookup("DASHBOARD_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(namespace) = lookup("DASHBOARD_NAMESPACE") {
            if namespace.is_empty()
                || !namespace
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ConfigError::InvalidVar {
                    name: "DASHBOARD_NAMESPACE",
                    value: namespace,
                });
            }
            config.namespace = namespace;
        }
        if let Some(capacity) = lookup("DASHBOARD_HISTORY_CAPACITY") {
            config.history_capacity = capacity
                .trim()
                .parse()
                .ok()
                .filter(|c: &usize| *c > 0)
                .ok_or_else(|| ConfigError::InvalidVar {
                    name: "DASHBOARD_HISTORY_CAPACITY",
                    value: capacity.clone(),
                })?;
        }
        if let Some(weights) = lookup("DASHBOARD_SCORE_WEIGHTS") {
            config.weights = parse_weights(&weights)?;
        }
        if let Some(mode) = lookup("DASHBOARD_PERSISTENCE") {
            config.persistence = match mode.trim().to_ascii_lowercase().as_str() {
                "file" => PersistenceMode::File,
                "memory" => PersistenceMode::Memory,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "DASHBOARD_PERSISTENCE",
                        value: mode,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn build_storage(&self) -> Box<dyn KeyValueStorage> {
        match self.persistence {
            PersistenceMode::File => {
                tracing::info!("Persisting dashboard state under {}", self.state_dir.display());
                Box::new(FileStorage::new(self.state_dir.clone()))
            }
            PersistenceMode::Memory => {
                tracing::warn!("DASHBOARD_PERSISTENCE=memory. Running without persistence.");
                Box::new(MemoryStorage::new())
            }
        }
    }
}

/// `"cs,ae,ttr"` in `MetricKey::ALL` order.
fn parse_weights(raw: &str) -> Result<ScoreWeights, ConfigError> {
    let invalid = || ConfigError::InvalidVar {
        name: "DASHBOARD_SCORE_WEIGHTS",
        value: raw.to_string(),
    };

    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    match parts.as_slice() {
        [cs, ae, ttr] => ScoreWeights::new(*cs, *ae, *ttr),
        _ => Err(invalid()),
    }
}

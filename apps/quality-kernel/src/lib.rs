//! Metric state engine behind the ticket quality dashboard.
//!
//! [`store::MetricStore`] owns the three metric values, their edit locks and
//! the derived overall score, and persists them through a
//! [`storage::KeyValueStorage`]. [`history::ScoreHistory`] keeps the bounded
//! score series for the chart, and [`controller::DashboardController`] turns
//! slider and lock events into store mutations and notifications.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod models;
pub mod observability;
pub mod server;
pub mod storage;
pub mod store;

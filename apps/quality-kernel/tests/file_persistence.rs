use std::fs;

use quality_kernel::controller::DashboardController;
use quality_kernel::events::EventType;
use quality_kernel::history::ScoreHistory;
use quality_kernel::models::{Metric, MetricKey, ScoreWeights};
use quality_kernel::storage::FileStorage;
use quality_kernel::store::{MetricStore, DEFAULT_NAMESPACE};
use tempfile::TempDir;

fn open(dir: &TempDir) -> DashboardController {
    let store = MetricStore::initialize(
        Box::new(FileStorage::new(dir.path().join("state"))),
        DEFAULT_NAMESPACE,
        ScoreWeights::default(),
    );
    DashboardController::new(store, ScoreHistory::new(50))
}

#[test]
fn reload_restores_values_and_locks() {
    let dir = TempDir::new().unwrap();
    {
        let mut controller = open(&dir);
        assert!(controller.on_slider_moved("customer_satisfaction", 50.0).is_accepted());
        assert!(controller.on_slider_moved("time_to_resolution", 0.0).is_accepted());
        assert!(controller.on_slider_moved("time_to_resolution", 100.0).is_accepted());
        controller.on_lock_toggled("agent_empathy").unwrap();
    }

    let controller = open(&dir);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.value(MetricKey::CustomerSatisfaction), 50);
    assert_eq!(snapshot.value(MetricKey::TimeToResolution), 100);
    assert_eq!(
        snapshot.metric(MetricKey::AgentEmpathy),
        Metric { value: 50, locked: true }
    );
    assert!(controller.is_durable());
}

#[test]
fn one_file_per_metric() {
    let dir = TempDir::new().unwrap();
    let mut controller = open(&dir);
    controller.on_slider_moved("agent_empathy", 12.0);

    let mut names: Vec<String> = fs::read_dir(dir.path().join("state"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "ticket_quality.agent_empathy.json",
            "ticket_quality.customer_satisfaction.json",
            "ticket_quality.time_to_resolution.json",
        ]
    );
}

#[test]
fn corrupt_file_falls_back_for_that_metric_only() {
    let dir = TempDir::new().unwrap();
    {
        let mut controller = open(&dir);
        controller.on_slider_moved("customer_satisfaction", 10.0);
        controller.on_slider_moved("agent_empathy", 20.0);
    }
    fs::write(
        dir.path().join("state").join("ticket_quality.agent_empathy.json"),
        "garbage",
    )
    .unwrap();

    let snapshot = open(&dir).snapshot();
    assert_eq!(snapshot.value(MetricKey::CustomerSatisfaction), 10);
    assert_eq!(snapshot.value(MetricKey::AgentEmpathy), 50);
}

#[test]
fn unreadable_directory_keeps_dashboard_interactive() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("state");
    fs::write(&blocker, "a file where the state directory should be").unwrap();

    let mut controller = open(&dir);
    assert!(!controller.is_durable());
    let mut events = controller.subscribe();

    assert!(controller.on_slider_moved("agent_empathy", 77.0).is_accepted());
    assert_eq!(controller.snapshot().value(MetricKey::AgentEmpathy), 77);
    assert_eq!(controller.history().len(), 1);

    // The read failure happened before anyone listened; the first
    // subscriber still hears about it.
    let degraded = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| e.event_type == EventType::PersistenceDegraded)
        .count();
    assert_eq!(degraded, 1);

    let mut late = controller.subscribe();
    controller.on_slider_moved("agent_empathy", 78.0);
    let degraded = std::iter::from_fn(|| late.try_recv().ok())
        .filter(|e| e.event_type == EventType::PersistenceDegraded)
        .count();
    assert_eq!(degraded, 0);
}

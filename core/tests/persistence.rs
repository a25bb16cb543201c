use comp_core::{
    config::PlanConfig,
    employee::Employee,
    error::{PersistenceError, PlanError},
    event::PlanEvent,
    persistence::{MemoryPersistence, ScenarioPersistence, SqlitePersistence},
    rate_table::RateSplit,
    scenario::{Baseline, DEFAULT_SCENARIO_ID},
    session::PlanningSession,
    store::PlanStore,
    types::{Level, PerformanceGrade},
};
use std::time::Duration;

fn employees() -> Vec<Employee> {
    vec![
        Employee::new("E1", Level::L1, "Sales", 30_000_000).with_grade(PerformanceGrade::B),
        Employee::new("E2", Level::L3, "Production", 65_000_000).with_grade(PerformanceGrade::A),
    ]
}

fn session(config: PlanConfig) -> PlanningSession {
    let mut session = PlanningSession::new(config, employees());
    session.apply_baseline(Baseline::new(3.2, 2.5));
    session
}

fn sqlite() -> SqlitePersistence {
    let store = PlanStore::in_memory().unwrap();
    store.migrate().unwrap();
    SqlitePersistence::new(store)
}

#[test]
fn store_round_trips_scenarios_and_active_id() {
    let store = PlanStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut s = session(PlanConfig::default_test());
    s.adjust_band("Sales", RateSplit::new(0.5, 0.0));
    let saved = s.save_scenario("Stored").unwrap();

    store.insert_scenario("ws", &saved).unwrap();
    store.set_active_scenario_id("ws", &saved.id).unwrap();

    let read = store.scenarios("ws").unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, saved.id);
    assert_eq!(read[0].data, saved.data);
    assert_eq!(store.active_scenario_id("ws").unwrap(), Some(saved.id.clone()));
    assert_eq!(store.scenario_count("other").unwrap(), 0);
}

#[test]
fn store_rejects_default_rows() {
    let store = PlanStore::in_memory().unwrap();
    store.migrate().unwrap();
    let s = session(PlanConfig::default_test());
    let default = s.list_scenarios().remove(0);
    assert!(store.insert_scenario("ws", &default).is_err());

    store.replace_scenarios("ws", &s.list_scenarios(), DEFAULT_SCENARIO_ID).unwrap();
    assert_eq!(store.scenario_count("ws").unwrap(), 0);
}

#[test]
fn store_keeps_latest_baseline() {
    let store = PlanStore::in_memory().unwrap();
    store.migrate().unwrap();
    assert_eq!(store.latest_baseline("ws").unwrap(), None);
    store.insert_baseline("ws", &Baseline::new(3.2, 2.5)).unwrap();
    store.insert_baseline("ws", &Baseline::new(4.0, 3.0)).unwrap();
    assert_eq!(store.latest_baseline("ws").unwrap(), Some(Baseline::new(4.0, 3.0)));
}

#[tokio::test]
async fn durable_save_then_hydrate_restores_state() {
    let persistence = sqlite();
    let config = PlanConfig::default_test();

    let mut first = session(config.clone());
    first.apply_baseline_durable(Baseline::new(3.5, 2.0), &persistence).await.unwrap();
    first.adjust_band("Production", RateSplit::new(1.0, 0.0));
    let saved = first.save_scenario_durable("Durable", &persistence).await.unwrap();
    let live = first.table().clone();

    let mut second = PlanningSession::new(config, employees());
    second.hydrate(&persistence).await.unwrap();

    assert_eq!(second.active_scenario_id(), saved.id);
    assert_eq!(second.table(), &live);
    assert_eq!(second.scenarios().baseline(), Some(Baseline::new(3.5, 2.0)));
    let listed = second.list_scenarios();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, DEFAULT_SCENARIO_ID);
    assert_eq!(listed[0].data.base_up_rate, 3.5);
}

#[tokio::test]
async fn durable_rename_and_delete_reach_storage() {
    let persistence = MemoryPersistence::new();
    let mut s = session(PlanConfig::default_test());
    let workspace = s.config().workspace.clone();

    let saved = s.save_scenario_durable("Draft", &persistence).await.unwrap();
    s.rename_scenario_durable(&saved.id, "Final", &persistence).await.unwrap();
    let stored = persistence.snapshot(&workspace);
    assert_eq!(stored.scenarios.len(), 1);
    assert_eq!(stored.scenarios[0].name, "Final");

    s.delete_scenario_durable(&saved.id, &persistence).await.unwrap();
    let stored = persistence.snapshot(&workspace);
    assert!(stored.scenarios.is_empty());
    assert_eq!(s.active_scenario_id(), DEFAULT_SCENARIO_ID);
}

#[tokio::test]
async fn failed_write_keeps_in_memory_change_and_reports() {
    let persistence = MemoryPersistence::new();
    persistence.set_failing(true);
    let mut s = session(PlanConfig::default_test());
    s.events().drain();

    let err = s.save_scenario_durable("Offline", &persistence).await.unwrap_err();
    assert!(matches!(err, PlanError::Persistence(PersistenceError::Unavailable(_))));

    // Optimistic: the scenario exists and is active in memory.
    assert_eq!(s.list_scenarios().len(), 2);
    assert_eq!(s.list_scenarios()[1].name, "Offline");
    assert!(s.events().history().any(|e| matches!(e, PlanEvent::PersistenceFailed { .. })));
    assert!(persistence.snapshot(&s.config().workspace).scenarios.is_empty());
}

#[tokio::test]
async fn slow_write_times_out() {
    let mut config = PlanConfig::default_test();
    config.persistence_timeout_ms = 20;
    let persistence = MemoryPersistence::new();
    persistence.set_delay(Some(Duration::from_millis(500)));
    let mut s = session(config);

    let err = s.save_scenario_durable("Slow", &persistence).await.unwrap_err();
    assert!(matches!(
        err,
        PlanError::Persistence(PersistenceError::Timeout { operation: "create", after_ms: 20 })
    ));
    assert_eq!(s.list_scenarios().len(), 2);
}

#[tokio::test]
async fn backend_rejects_deleting_default() {
    let memory = MemoryPersistence::new();
    let err = memory.delete("ws", DEFAULT_SCENARIO_ID.into()).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Rejected { .. }));

    let sqlite = sqlite();
    let err = sqlite.delete("ws", DEFAULT_SCENARIO_ID.into()).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Rejected { .. }));
}

#[tokio::test]
async fn unchanged_baseline_is_not_rewritten() {
    let persistence = MemoryPersistence::new();
    let mut s = session(PlanConfig::default_test());
    persistence.set_failing(true);

    // 3.2 / 2.5 is already applied; no write is attempted.
    let replaced = s.apply_baseline_durable(Baseline::new(3.2, 2.5), &persistence).await.unwrap();
    assert!(!replaced);

    let err = s.apply_baseline_durable(Baseline::new(4.0, 3.0), &persistence).await.unwrap_err();
    assert!(matches!(err, PlanError::Persistence(_)));
    assert_eq!(s.table().company_rate(), RateSplit::new(4.0, 3.0));
}

#[tokio::test]
async fn failed_load_write_keeps_the_switched_active_scenario() {
    let persistence = MemoryPersistence::new();
    let mut s = session(PlanConfig::default_test());
    s.adjust_band("Sales", RateSplit::new(0.75, 0.0));
    let saved = s.save_scenario_durable("Switch", &persistence).await.unwrap();
    let saved_table = s.table().clone();
    s.load_scenario_durable(DEFAULT_SCENARIO_ID, &persistence).await.unwrap();
    assert!(!s.table().has_band_overrides());

    persistence.set_failing(true);
    s.events().drain();
    let err = s.load_scenario_durable(&saved.id, &persistence).await.unwrap_err();

    assert!(matches!(err, PlanError::Persistence(_)));
    assert_eq!(s.active_scenario_id(), saved.id);
    assert_eq!(s.table(), &saved_table);
    assert!(s.events().history().any(|e| matches!(e, PlanEvent::PersistenceFailed { .. })));

    // Storage still holds the last successful write.
    let stored = persistence.snapshot(&s.config().workspace);
    assert_eq!(stored.active_id.as_deref(), Some(DEFAULT_SCENARIO_ID));
}

#[tokio::test]
async fn deleting_the_active_scenario_moves_the_stored_pointer() {
    let persistence = MemoryPersistence::new();
    let mut s = session(PlanConfig::default_test());
    let workspace = s.config().workspace.clone();

    let saved = s.save_scenario_durable("Short-lived", &persistence).await.unwrap();
    assert_eq!(persistence.snapshot(&workspace).active_id, Some(saved.id.clone()));

    s.delete_scenario_durable(&saved.id, &persistence).await.unwrap();
    let stored = persistence.snapshot(&workspace);
    assert_eq!(s.active_scenario_id(), DEFAULT_SCENARIO_ID);
    assert_eq!(stored.active_id.as_deref(), Some(DEFAULT_SCENARIO_ID));
    assert!(stored.scenarios.is_empty());
}

#[tokio::test]
async fn deleting_the_active_scenario_in_sqlite_resets_active_row() {
    let persistence = sqlite();
    let mut s = session(PlanConfig::default_test());

    let saved = s.save_scenario_durable("Gone", &persistence).await.unwrap();
    s.delete_scenario_durable(&saved.id, &persistence).await.unwrap();

    let stored = persistence.fetch_all(&s.config().workspace).await.unwrap();
    assert!(stored.scenarios.is_empty());
    assert_eq!(stored.active_id.as_deref(), Some(DEFAULT_SCENARIO_ID));
}

//! The durable scenario boundary.
//!
//! This is the only place with I/O latency. Every call returns a future
//! that may fail independently of in-memory state; callers apply their
//! in-memory change first and never roll it back on a failed write.
//!
//! Contract, per workspace:
//!   fetch_all:   every saved scenario plus the active id   (GET)
//!   create:      append one scenario                       (POST)
//!   replace_all: overwrite the list and the active id      (PUT)
//!   delete:      remove one scenario, rejecting "default"  (DELETE ?id=)

use crate::{
    error::PersistenceError,
    scenario::{Baseline, Scenario, DEFAULT_SCENARIO_ID},
    store::{PlanStore, StoreResult},
    types::ScenarioId,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type PersistFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// What `fetch_all` returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredScenarios {
    pub scenarios: Vec<Scenario>,
    pub active_id: Option<ScenarioId>,
    pub baseline:  Option<Baseline>,
}

pub trait ScenarioPersistence: Send + Sync {
    fn fetch_all<'a>(&'a self, workspace: &'a str) -> PersistFuture<'a, StoredScenarios>;

    fn create<'a>(&'a self, workspace: &'a str, scenario: Scenario) -> PersistFuture<'a, ()>;

    fn replace_all<'a>(
        &'a self,
        workspace: &'a str,
        scenarios: Vec<Scenario>,
        active_id: ScenarioId,
    ) -> PersistFuture<'a, ()>;

    fn delete<'a>(&'a self, workspace: &'a str, scenario_id: ScenarioId) -> PersistFuture<'a, ()>;

    /// Record a baseline that changed the default scenario.
    fn record_baseline<'a>(&'a self, workspace: &'a str, baseline: Baseline) -> PersistFuture<'a, ()>;
}

/// Await a persistence call, turning an elapsed deadline into
/// `PersistenceError::Timeout`.
pub async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    call: PersistFuture<'_, T>,
) -> Result<T, PersistenceError> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("store: {operation} timed out after {} ms", after.as_millis());
            Err(PersistenceError::Timeout {
                operation,
                after_ms: after.as_millis() as u64,
            })
        }
    }
}

fn reject_default(scenario_id: &str) -> Result<(), PersistenceError> {
    if scenario_id == DEFAULT_SCENARIO_ID {
        return Err(PersistenceError::Rejected {
            reason: "the default scenario cannot be deleted".into(),
        });
    }
    Ok(())
}

// ── SQLite ───────────────────────────────────────────────────────────────────

/// `ScenarioPersistence` over a `PlanStore`. Queries run on tokio's
/// blocking pool; the connection is shared behind a mutex.
#[derive(Clone)]
pub struct SqlitePersistence {
    store: Arc<Mutex<PlanStore>>,
}

impl SqlitePersistence {
    pub fn new(store: PlanStore) -> Self {
        Self { store: Arc::new(Mutex::new(store)) }
    }

    fn run<T, F>(&self, op: F) -> PersistFuture<'static, T>
    where
        T: Send + 'static,
        F: FnOnce(&PlanStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let guard = store
                    .lock()
                    .map_err(|_| PersistenceError::Unavailable("store mutex poisoned".into()))?;
                op(&guard)
            })
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?
        })
    }
}

impl ScenarioPersistence for SqlitePersistence {
    fn fetch_all<'a>(&'a self, workspace: &'a str) -> PersistFuture<'a, StoredScenarios> {
        let workspace = workspace.to_string();
        self.run(move |store| {
            Ok(StoredScenarios {
                scenarios: store.scenarios(&workspace)?,
                active_id: store.active_scenario_id(&workspace)?,
                baseline:  store.latest_baseline(&workspace)?,
            })
        })
    }

    fn create<'a>(&'a self, workspace: &'a str, scenario: Scenario) -> PersistFuture<'a, ()> {
        let workspace = workspace.to_string();
        self.run(move |store| {
            store.insert_scenario(&workspace, &scenario)?;
            store.set_active_scenario_id(&workspace, &scenario.id)
        })
    }

    fn replace_all<'a>(
        &'a self,
        workspace: &'a str,
        scenarios: Vec<Scenario>,
        active_id: ScenarioId,
    ) -> PersistFuture<'a, ()> {
        let workspace = workspace.to_string();
        self.run(move |store| store.replace_scenarios(&workspace, &scenarios, &active_id))
    }

    fn delete<'a>(&'a self, workspace: &'a str, scenario_id: ScenarioId) -> PersistFuture<'a, ()> {
        if let Err(e) = reject_default(&scenario_id) {
            return Box::pin(async move { Err(e) });
        }
        let workspace = workspace.to_string();
        self.run(move |store| {
            if !store.delete_scenario(&workspace, &scenario_id)? {
                log::debug!("store: delete of unknown scenario {scenario_id} ignored");
            }
            Ok(())
        })
    }

    fn record_baseline<'a>(&'a self, workspace: &'a str, baseline: Baseline) -> PersistFuture<'a, ()> {
        let workspace = workspace.to_string();
        self.run(move |store| store.insert_baseline(&workspace, &baseline))
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local persistence with switchable failure and latency, for
/// tests and for running without a database.
#[derive(Default)]
pub struct MemoryPersistence {
    workspaces: Mutex<HashMap<String, StoredScenarios>>,
    failing:    AtomicBool,
    delay:      Mutex<Option<Duration>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent call (to exercise timeouts).
    pub fn set_delay(&self, delay: Option<Duration>) {
        if let Ok(mut d) = self.delay.lock() {
            *d = delay;
        }
    }

    /// Copy of what is stored for a workspace.
    pub fn snapshot(&self, workspace: &str) -> StoredScenarios {
        self.workspaces
            .lock()
            .ok()
            .and_then(|w| w.get(workspace).cloned())
            .unwrap_or_default()
    }

    fn call<'a, T, F>(&'a self, workspace: &'a str, op: F) -> PersistFuture<'a, T>
    where
        T: Send + 'a,
        F: FnOnce(&mut StoredScenarios) -> Result<T, PersistenceError> + Send + 'a,
    {
        Box::pin(async move {
            let delay = self.delay.lock().ok().and_then(|d| *d);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("memory persistence set to fail".into()));
            }
            let mut workspaces = self
                .workspaces
                .lock()
                .map_err(|_| PersistenceError::Unavailable("workspace map poisoned".into()))?;
            op(workspaces.entry(workspace.to_string()).or_default())
        })
    }
}

impl ScenarioPersistence for MemoryPersistence {
    fn fetch_all<'a>(&'a self, workspace: &'a str) -> PersistFuture<'a, StoredScenarios> {
        self.call(workspace, |stored| Ok(stored.clone()))
    }

    fn create<'a>(&'a self, workspace: &'a str, scenario: Scenario) -> PersistFuture<'a, ()> {
        self.call(workspace, move |stored| {
            if scenario.is_default() {
                return Err(PersistenceError::Rejected {
                    reason: "the default scenario is derived and cannot be stored".into(),
                });
            }
            stored.active_id = Some(scenario.id.clone());
            stored.scenarios.push(scenario);
            Ok(())
        })
    }

    fn replace_all<'a>(
        &'a self,
        workspace: &'a str,
        scenarios: Vec<Scenario>,
        active_id: ScenarioId,
    ) -> PersistFuture<'a, ()> {
        self.call(workspace, move |stored| {
            stored.scenarios = scenarios.into_iter().filter(|s| !s.is_default()).collect();
            stored.active_id = Some(active_id);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, workspace: &'a str, scenario_id: ScenarioId) -> PersistFuture<'a, ()> {
        self.call(workspace, move |stored| {
            reject_default(&scenario_id)?;
            stored.scenarios.retain(|s| s.id != scenario_id);
            Ok(())
        })
    }

    fn record_baseline<'a>(&'a self, workspace: &'a str, baseline: Baseline) -> PersistFuture<'a, ()> {
        self.call(workspace, move |stored| {
            stored.baseline = Some(baseline);
            Ok(())
        })
    }
}

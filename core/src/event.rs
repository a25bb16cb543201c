//! The event bus: how dependents learn that planning state changed.
//!
//! RULE: the session publishes one event per state transition, after the
//! transition is complete. Listeners never mutate the session; they
//! recompute whatever they derive from the new snapshot.

use crate::types::{BandName, Level, PerformanceGrade, ScenarioId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which edit produced a new rate table revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableChange {
    CompanyRate,
    LevelRate { level: Level },
    BandAdjustment { band: BandName },
    PerformanceWeight { grade: PerformanceGrade },
    TotalBudget,
    Ancillary,
    ScenarioLoaded { scenario_id: ScenarioId },
    BaselineResync,
}

/// Every event published by a planning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    RateTableChanged {
        revision: u64,
        change:   TableChange,
    },
    ScenarioSaved {
        scenario_id: ScenarioId,
        name:        String,
    },
    ScenarioLoaded {
        scenario_id: ScenarioId,
    },
    ScenarioRenamed {
        scenario_id: ScenarioId,
        name:        String,
    },
    ScenarioDeleted {
        scenario_id: ScenarioId,
    },
    DefaultScenarioRefreshed {
        base_up:        f64,
        merit:          f64,
        live_replaced:  bool,
    },
    PersistenceFailed {
        operation: String,
        reason:    String,
    },
}

impl PlanEvent {
    /// Stable name for logs and the runner's output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RateTableChanged { .. }         => "rate_table_changed",
            Self::ScenarioSaved { .. }            => "scenario_saved",
            Self::ScenarioLoaded { .. }           => "scenario_loaded",
            Self::ScenarioRenamed { .. }          => "scenario_renamed",
            Self::ScenarioDeleted { .. }          => "scenario_deleted",
            Self::DefaultScenarioRefreshed { .. } => "default_scenario_refreshed",
            Self::PersistenceFailed { .. }        => "persistence_failed",
        }
    }
}

/// Anything that recomputes when the plan changes.
pub trait PlanListener: Send {
    fn name(&self) -> &'static str;
    fn on_event(&mut self, event: &PlanEvent);
}

pub const EVENT_HISTORY_LIMIT: usize = 256;

/// Synchronous fan-out to listeners, plus a bounded history.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn PlanListener>>,
    history:   VecDeque<PlanEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn PlanListener>) {
        log::debug!("session: listener '{}' subscribed", listener.name());
        self.listeners.push(listener);
    }

    pub fn publish(&mut self, event: PlanEvent) {
        log::debug!("session: publish {}", event.type_name());
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
        if self.history.len() == EVENT_HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    pub fn history(&self) -> impl Iterator<Item = &PlanEvent> {
        self.history.iter()
    }

    /// Take and clear the history (the runner drains it after each command).
    pub fn drain(&mut self) -> Vec<PlanEvent> {
        self.history.drain(..).collect()
    }
}

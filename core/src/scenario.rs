//! Named snapshots of the rate layers.
//!
//! Lifecycle per id: unsaved (live edit) → saved → renamed* → deleted.
//!
//! RULES:
//!   - Exactly one scenario has id "default". It is never stored: it is
//!     derived from the baseline recommendation every time it is read,
//!     so it cannot go stale. It cannot be renamed or deleted.
//!   - The default carries the configured weights and budget ceiling, so
//!     loading it also discards live weight and ceiling edits.
//!   - Saved scenarios are immutable apart from rename. Loading copies the
//!     stored table out; the stored copy is never handed out mutably.
//!   - list() yields the default first, then saved scenarios in insertion
//!     order.

use crate::{
    budget::{AncillaryFigures, DetailedLevelRate},
    config::PlanConfig,
    error::{PlanError, PlanResult},
    rate_table::{
        BandAdjustments, BandFinalRateLayer, LevelRateLayer, PerformanceWeightTable, RateSplit,
        RateTable,
    },
    types::{Level, ScenarioId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SCENARIO_ID: &str = "default";
pub const DEFAULT_SCENARIO_NAME: &str = "Default";

/// Company-wide recommendation supplied from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub base_up_percentage:        f64,
    pub merit_increase_percentage: f64,
}

impl Baseline {
    pub fn new(base_up: f64, merit: f64) -> Self {
        Self {
            base_up_percentage:        base_up,
            merit_increase_percentage: merit,
        }
    }

    pub fn split(&self) -> RateSplit {
        RateSplit::new(self.base_up_percentage, self.merit_increase_percentage)
    }
}

/// Figures derived from a table and the employee population at save time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFigures {
    pub weighted_average_rate: f64,
    pub used_budget:           i64,
}

/// The persisted scenario payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioData {
    pub base_up_rate:          f64,
    pub merit_rate:            f64,
    pub level_rates:           LevelRateLayer,
    pub detailed_level_rates:  BTreeMap<Level, DetailedLevelRate>,
    pub total_budget:          i64,
    pub band_adjustments:      BandAdjustments,
    #[serde(default)]
    pub band_final_rates:      BandFinalRateLayer,
    pub performance_weights:   PerformanceWeightTable,
    #[serde(default)]
    pub promotion_budgets:     BTreeMap<Level, i64>,
    #[serde(default)]
    pub additional_budget:     i64,
    #[serde(default)]
    pub weighted_average_rate: f64,
    pub used_budget:           i64,
}

impl ScenarioData {
    pub fn capture(table: &RateTable, ancillary: &AncillaryFigures, figures: DerivedFigures) -> Self {
        let company = table.company_rate();
        Self {
            base_up_rate:          company.base_up,
            merit_rate:            company.merit,
            level_rates:           table.level_rates().clone(),
            detailed_level_rates:  ancillary.detailed_level_rates.clone(),
            total_budget:          table.total_budget(),
            band_adjustments:      table.band_adjustments().clone(),
            band_final_rates:      table.band_final_rates().clone(),
            performance_weights:   table.performance_weights().clone(),
            promotion_budgets:     ancillary.promotion_budgets.clone(),
            additional_budget:     ancillary.additional_budget,
            weighted_average_rate: figures.weighted_average_rate,
            used_budget:           figures.used_budget,
        }
    }

    /// Rebuild the rate table. Records written without cached band finals
    /// get them re-derived from the stored adjustments.
    pub fn rate_table(&self) -> RateTable {
        let company = RateSplit::new(self.base_up_rate, self.merit_rate);
        if self.band_final_rates.is_empty() && !self.band_adjustments.is_empty() {
            let base = RateTable::from_layers(
                company,
                self.level_rates.clone(),
                BTreeMap::new(),
                BTreeMap::new(),
                self.performance_weights.clone(),
                self.total_budget,
            );
            return self
                .band_adjustments
                .iter()
                .fold(base, |table, (band, delta)| table.with_band_adjustment(band, *delta));
        }
        RateTable::from_layers(
            company,
            self.level_rates.clone(),
            self.band_adjustments.clone(),
            self.band_final_rates.clone(),
            self.performance_weights.clone(),
            self.total_budget,
        )
    }

    pub fn ancillary(&self) -> AncillaryFigures {
        AncillaryFigures {
            detailed_level_rates: self.detailed_level_rates.clone(),
            promotion_budgets:    self.promotion_budgets.clone(),
            additional_budget:    self.additional_budget,
        }
    }

    pub fn figures(&self) -> DerivedFigures {
        DerivedFigures {
            weighted_average_rate: self.weighted_average_rate,
            used_budget:           self.used_budget,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id:         ScenarioId,
    pub name:       String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data:       ScenarioData,
}

impl Scenario {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_SCENARIO_ID
    }
}

/// What a baseline update did.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOutcome {
    /// Same value as before; nothing regenerated.
    Unchanged,
    /// The default snapshot was regenerated. When the default is the active
    /// scenario the caller must replace its live state with `table`.
    Refreshed {
        default_active: bool,
        table:          RateTable,
        ancillary:      AncillaryFigures,
    },
}

pub struct ScenarioStore {
    levels:          Vec<Level>,
    weights:         PerformanceWeightTable,
    total_budget:    i64,
    baseline:        Option<Baseline>,
    default_stamp:   DateTime<Utc>,
    default_figures: DerivedFigures,
    saved:           Vec<Scenario>,
    active_id:       ScenarioId,
}

impl ScenarioStore {
    pub fn new(config: &PlanConfig, now: DateTime<Utc>) -> Self {
        Self {
            levels:          config.levels.clone(),
            weights:         config.weight_table(),
            total_budget:    config.total_budget,
            baseline:        None,
            default_stamp:   now,
            default_figures: DerivedFigures::default(),
            saved:           Vec::new(),
            active_id:       DEFAULT_SCENARIO_ID.to_string(),
        }
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn is_default_active(&self) -> bool {
        self.active_id == DEFAULT_SCENARIO_ID
    }

    // ── Default scenario ───────────────────────────────────────

    /// The default table: baseline rates on every level, no band overrides.
    pub fn default_table(&self) -> RateTable {
        let company = self.baseline.map(|b| b.split()).unwrap_or(RateSplit::ZERO);
        RateTable::uniform(&self.levels, company, self.weights.clone(), self.total_budget)
    }

    /// Zero promotion and additional budgets.
    pub fn default_ancillary(&self) -> AncillaryFigures {
        let company = self.baseline.map(|b| b.split()).unwrap_or(RateSplit::ZERO);
        AncillaryFigures::zeroed(&self.levels, company.base_up, company.merit)
    }

    pub fn default_scenario(&self) -> Scenario {
        Scenario {
            id:         DEFAULT_SCENARIO_ID.to_string(),
            name:       DEFAULT_SCENARIO_NAME.to_string(),
            created_at: self.default_stamp,
            updated_at: self.default_stamp,
            data:       ScenarioData::capture(
                &self.default_table(),
                &self.default_ancillary(),
                self.default_figures,
            ),
        }
    }

    /// Record the population-derived figures for the current default.
    pub fn price_default(&mut self, figures: DerivedFigures) {
        self.default_figures = figures;
    }

    /// Apply a new baseline. Only a changed value regenerates the default.
    pub fn set_baseline(&mut self, baseline: Baseline, now: DateTime<Utc>) -> BaselineOutcome {
        if self.baseline == Some(baseline) {
            log::debug!("scenario: baseline re-supplied unchanged, default kept");
            return BaselineOutcome::Unchanged;
        }
        self.baseline = Some(baseline);
        self.default_stamp = now;
        self.default_figures = DerivedFigures::default();

        let default_active = self.is_default_active();
        log::info!(
            "scenario: default regenerated from baseline base_up={:.2} merit={:.2} (active={default_active})",
            baseline.base_up_percentage,
            baseline.merit_increase_percentage
        );
        BaselineOutcome::Refreshed {
            default_active,
            table: self.default_table(),
            ancillary: self.default_ancillary(),
        }
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn list(&self) -> Vec<Scenario> {
        std::iter::once(self.default_scenario())
            .chain(self.saved.iter().cloned())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Scenario> {
        if id == DEFAULT_SCENARIO_ID {
            return Some(self.default_scenario());
        }
        self.saved.iter().find(|s| s.id == id).cloned()
    }

    // ── Transitions ────────────────────────────────────────────

    /// Snapshot the given layers under a fresh id and make it active.
    pub fn save(
        &mut self,
        name: &str,
        table: &RateTable,
        ancillary: &AncillaryFigures,
        figures: DerivedFigures,
        now: DateTime<Utc>,
    ) -> Scenario {
        let scenario = Scenario {
            id:         new_scenario_id(),
            name:       name.trim().to_string(),
            created_at: now,
            updated_at: now,
            data:       ScenarioData::capture(table, ancillary, figures),
        };
        self.saved.push(scenario.clone());
        self.active_id = scenario.id.clone();
        log::info!("scenario: saved {} '{}'", scenario.id, scenario.name);
        scenario
    }

    /// Copy a scenario's layers out and make it active.
    /// Loading the default re-derives it from the current baseline.
    pub fn load(&mut self, id: &str) -> PlanResult<(RateTable, AncillaryFigures)> {
        let loaded = if id == DEFAULT_SCENARIO_ID {
            (self.default_table(), self.default_ancillary())
        } else {
            let scenario = self
                .saved
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| PlanError::ScenarioNotFound { id: id.to_string() })?;
            (scenario.data.rate_table(), scenario.data.ancillary())
        };
        self.active_id = id.to_string();
        log::info!("scenario: loaded {id}");
        Ok(loaded)
    }

    pub fn rename(&mut self, id: &str, new_name: &str, now: DateTime<Utc>) -> PlanResult<Scenario> {
        if id == DEFAULT_SCENARIO_ID {
            log::warn!("scenario: rename of protected scenario rejected");
            return Err(PlanError::ProtectedScenario { id: id.to_string(), operation: "renamed" });
        }
        let scenario = self
            .saved
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PlanError::ScenarioNotFound { id: id.to_string() })?;
        scenario.name = new_name.trim().to_string();
        scenario.updated_at = now;
        log::info!("scenario: renamed {id} to '{}'", scenario.name);
        Ok(scenario.clone())
    }

    /// Remove a saved scenario. Deleting the active one makes the default
    /// active again without touching any live state.
    pub fn delete(&mut self, id: &str) -> PlanResult<Scenario> {
        if id == DEFAULT_SCENARIO_ID {
            log::warn!("scenario: delete of protected scenario rejected");
            return Err(PlanError::ProtectedScenario { id: id.to_string(), operation: "deleted" });
        }
        let index = self
            .saved
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| PlanError::ScenarioNotFound { id: id.to_string() })?;
        let removed = self.saved.remove(index);
        if self.active_id == id {
            self.active_id = DEFAULT_SCENARIO_ID.to_string();
        }
        log::info!("scenario: deleted {id}");
        Ok(removed)
    }

    /// Replace saved scenarios with records read back from durable storage.
    /// Any stored "default" row is ignored; an unknown active id falls back
    /// to the default.
    pub fn restore(&mut self, scenarios: Vec<Scenario>, active_id: Option<ScenarioId>) {
        self.saved = scenarios.into_iter().filter(|s| !s.is_default()).collect();
        self.active_id = match active_id {
            Some(id) if self.saved.iter().any(|s| s.id == id) => id,
            _ => DEFAULT_SCENARIO_ID.to_string(),
        };
        log::info!(
            "scenario: restored {} saved scenarios, active={}",
            self.saved.len(),
            self.active_id
        );
    }
}

fn new_scenario_id() -> ScenarioId {
    uuid::Uuid::new_v4().to_string()
}

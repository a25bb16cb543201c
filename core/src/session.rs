//! The planning session: live rate table, scenarios and derived figures
//! for one editor.
//!
//! RULES:
//!   - The live RateTable is replaced, never mutated. Each replacement bumps
//!     the revision and publishes `RateTableChanged`.
//!   - Derived figures (aggregates, budget, competitiveness) are computed on
//!     demand from the current snapshot; nothing is cached between edits.
//!   - Durable operations apply the in-memory change first, then await the
//!     write. A failed write is returned as `PlanError::Persistence` and the
//!     in-memory state stays as it is.

use crate::{
    aggregation::{self, AggregateOptions, AggregateResult},
    budget::{self, AncillaryFigures, BudgetReport, DetailedLevelRate},
    competitiveness::{self, BenchmarkTable, CompetitivenessCalculator, CompetitivenessReport},
    config::PlanConfig,
    employee::Employee,
    error::{PlanError, PlanResult},
    event::{EventBus, PlanEvent, PlanListener, TableChange},
    persistence::{with_timeout, ScenarioPersistence},
    rate_table::{RateSplit, RateTable},
    scenario::{Baseline, BaselineOutcome, DerivedFigures, Scenario, ScenarioStore},
    types::{Level, PerformanceGrade},
};
use chrono::Utc;

pub struct PlanningSession {
    config:         PlanConfig,
    employees:      Vec<Employee>,
    benchmarks:     Option<BenchmarkTable>,
    system_default: Option<RateSplit>,
    live:           RateTable,
    ancillary:      AncillaryFigures,
    revision:       u64,
    scenarios:      ScenarioStore,
    bus:            EventBus,
}

impl PlanningSession {
    /// Start a session on the default scenario.
    pub fn new(config: PlanConfig, employees: Vec<Employee>) -> Self {
        let scenarios = ScenarioStore::new(&config, Utc::now());
        let live = scenarios.default_table();
        let ancillary = scenarios.default_ancillary();
        let mut session = Self {
            config,
            employees,
            benchmarks: None,
            system_default: None,
            live,
            ancillary,
            revision: 0,
            scenarios,
            bus: EventBus::new(),
        };
        session.price_default();
        session
    }

    pub fn with_benchmarks(mut self, benchmarks: BenchmarkTable) -> Self {
        self.benchmarks = Some(benchmarks);
        self
    }

    /// Rate used for employees whose level has no entry in any layer.
    pub fn with_system_default(mut self, split: RateSplit) -> Self {
        self.system_default = Some(split);
        self
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn config(&self) -> &PlanConfig { &self.config }
    pub fn employees(&self) -> &[Employee] { &self.employees }
    pub fn table(&self) -> &RateTable { &self.live }
    pub fn ancillary(&self) -> &AncillaryFigures { &self.ancillary }
    pub fn revision(&self) -> u64 { self.revision }
    pub fn scenarios(&self) -> &ScenarioStore { &self.scenarios }
    pub fn benchmarks(&self) -> Option<&BenchmarkTable> { self.benchmarks.as_ref() }
    pub fn events(&mut self) -> &mut EventBus { &mut self.bus }

    pub fn subscribe(&mut self, listener: Box<dyn PlanListener>) {
        self.bus.subscribe(listener);
    }

    /// Swap in a refreshed employee population.
    pub fn replace_employees(&mut self, employees: Vec<Employee>) {
        log::info!("session: employee population refreshed ({} records)", employees.len());
        self.employees = employees;
        self.price_default();
    }

    pub fn set_benchmarks(&mut self, benchmarks: BenchmarkTable) {
        self.benchmarks = Some(benchmarks);
    }

    /// Replace market data with a seeded synthetic table built around the
    /// own-company statistic.
    pub fn use_synthetic_benchmarks(&mut self) {
        let table = competitiveness::synthesize_benchmarks(
            &self.employees,
            self.config.own_statistic,
            &self.config.synthetic_benchmark,
        );
        log::warn!(
            "session: using synthetic benchmarks (seed={})",
            self.config.synthetic_benchmark.seed
        );
        self.benchmarks = Some(table);
    }

    // ── Edits ──────────────────────────────────────────────────

    fn replace_live(&mut self, table: RateTable, change: TableChange) {
        self.live = table;
        self.revision += 1;
        self.bus.publish(PlanEvent::RateTableChanged {
            revision: self.revision,
            change,
        });
    }

    pub fn set_company_rate(&mut self, rate: RateSplit) {
        let next = self.live.with_company_rate(rate);
        for detail in self.ancillary.detailed_level_rates.values_mut() {
            detail.base_up = rate.base_up;
            detail.merit = rate.merit;
        }
        self.replace_live(next, TableChange::CompanyRate);
    }

    pub fn set_level_rate(&mut self, level: Level, rate: RateSplit) {
        let next = self.live.with_level_rate(level, rate);
        let detail = self.ancillary.detailed_level_rates.entry(level).or_default();
        detail.base_up = rate.base_up;
        detail.merit = rate.merit;
        self.replace_live(next, TableChange::LevelRate { level });
    }

    pub fn adjust_band(&mut self, band: &str, delta: RateSplit) {
        let next = self.live.with_band_adjustment(band, delta);
        self.replace_live(next, TableChange::BandAdjustment { band: band.to_string() });
    }

    pub fn set_performance_weight(&mut self, grade: PerformanceGrade, weight: f64) {
        let next = self.live.with_performance_weight(grade, weight);
        self.replace_live(next, TableChange::PerformanceWeight { grade });
    }

    pub fn set_total_budget(&mut self, total_budget: i64) {
        let next = self.live.with_total_budget(total_budget);
        self.replace_live(next, TableChange::TotalBudget);
    }

    /// Promotion/advancement/additional rates; base-up and merit in the
    /// detail row also update the level layer.
    pub fn set_detailed_level_rate(&mut self, level: Level, detail: DetailedLevelRate) {
        self.ancillary.detailed_level_rates.insert(level, detail);
        let next = self
            .live
            .with_level_rate(level, RateSplit::new(detail.base_up, detail.merit));
        self.replace_live(next, TableChange::LevelRate { level });
    }

    pub fn set_promotion_budget(&mut self, level: Level, amount: i64) {
        self.ancillary.promotion_budgets.insert(level, amount);
        let next = self.live.clone();
        self.replace_live(next, TableChange::Ancillary);
    }

    pub fn set_additional_budget(&mut self, amount: i64) {
        self.ancillary.additional_budget = amount;
        let next = self.live.clone();
        self.replace_live(next, TableChange::Ancillary);
    }

    // ── Derived figures ────────────────────────────────────────

    fn aggregate_options(&self) -> AggregateOptions<'_> {
        AggregateOptions {
            system_default: self.system_default,
            benchmarks:     self.benchmarks.as_ref(),
            statistic:      self.config.own_statistic,
        }
    }

    pub fn aggregate(&self) -> PlanResult<AggregateResult> {
        aggregation::aggregate_with(&self.employees, &self.live, &self.aggregate_options())
    }

    pub fn budget_report(&self) -> PlanResult<BudgetReport> {
        let aggregate = self.aggregate()?;
        Ok(budget::reconcile(&aggregate, &self.ancillary, self.live.total_budget()))
    }

    pub fn competitiveness(&self) -> PlanResult<CompetitivenessReport> {
        let mut calculator = CompetitivenessCalculator::new(self.config.own_statistic);
        if let Some(split) = self.system_default {
            calculator = calculator.with_system_default(split);
        }
        let empty = BenchmarkTable::new();
        let benchmarks = self.benchmarks.as_ref().unwrap_or(&empty);
        calculator.report(&self.employees, &self.live, benchmarks)
    }

    fn figures_for(&self, table: &RateTable, ancillary: &AncillaryFigures) -> PlanResult<DerivedFigures> {
        let aggregate = aggregation::aggregate_with(&self.employees, table, &self.aggregate_options())?;
        let report = budget::reconcile(&aggregate, ancillary, table.total_budget());
        Ok(DerivedFigures {
            weighted_average_rate: aggregate.company.avg_effective_rate,
            used_budget:           report.used_budget,
        })
    }

    fn price_default(&mut self) {
        let table = self.scenarios.default_table();
        let ancillary = self.scenarios.default_ancillary();
        match self.figures_for(&table, &ancillary) {
            Ok(figures) => self.scenarios.price_default(figures),
            Err(e) => log::warn!("session: default scenario left unpriced: {e}"),
        }
    }

    // ── Scenarios (in memory) ──────────────────────────────────

    pub fn list_scenarios(&self) -> Vec<Scenario> {
        self.scenarios.list()
    }

    pub fn active_scenario_id(&self) -> &str {
        self.scenarios.active_id()
    }

    /// Snapshot the live layers under a new id; the new scenario becomes active.
    pub fn save_scenario(&mut self, name: &str) -> PlanResult<Scenario> {
        let figures = self.figures_for(&self.live, &self.ancillary)?;
        let scenario = self
            .scenarios
            .save(name, &self.live, &self.ancillary, figures, Utc::now());
        self.bus.publish(PlanEvent::ScenarioSaved {
            scenario_id: scenario.id.clone(),
            name:        scenario.name.clone(),
        });
        Ok(scenario)
    }

    /// Replace all live layers with a scenario's copy.
    pub fn load_scenario(&mut self, id: &str) -> PlanResult<()> {
        let (table, ancillary) = self.scenarios.load(id)?;
        self.ancillary = ancillary;
        self.replace_live(table, TableChange::ScenarioLoaded { scenario_id: id.to_string() });
        self.bus.publish(PlanEvent::ScenarioLoaded { scenario_id: id.to_string() });
        Ok(())
    }

    pub fn rename_scenario(&mut self, id: &str, new_name: &str) -> PlanResult<Scenario> {
        let scenario = self.scenarios.rename(id, new_name, Utc::now())?;
        self.bus.publish(PlanEvent::ScenarioRenamed {
            scenario_id: scenario.id.clone(),
            name:        scenario.name.clone(),
        });
        Ok(scenario)
    }

    pub fn delete_scenario(&mut self, id: &str) -> PlanResult<Scenario> {
        let removed = self.scenarios.delete(id)?;
        self.bus.publish(PlanEvent::ScenarioDeleted { scenario_id: removed.id.clone() });
        Ok(removed)
    }

    /// Feed a baseline recommendation. Returns true when the live table was
    /// replaced (the default scenario was active and the value changed).
    pub fn apply_baseline(&mut self, baseline: Baseline) -> bool {
        match self.scenarios.set_baseline(baseline, Utc::now()) {
            BaselineOutcome::Unchanged => false,
            BaselineOutcome::Refreshed { default_active, table, ancillary } => {
                self.price_default();
                if default_active {
                    self.ancillary = ancillary;
                    self.replace_live(table, TableChange::BaselineResync);
                }
                self.bus.publish(PlanEvent::DefaultScenarioRefreshed {
                    base_up:       baseline.base_up_percentage,
                    merit:         baseline.merit_increase_percentage,
                    live_replaced: default_active,
                });
                default_active
            }
        }
    }

    // ── Scenarios (durable) ────────────────────────────────────

    fn persistence_failed(&mut self, operation: &str, error: PlanError) -> PlanError {
        log::warn!("session: {operation} not persisted: {error}");
        self.bus.publish(PlanEvent::PersistenceFailed {
            operation: operation.to_string(),
            reason:    error.to_string(),
        });
        error
    }

    /// Load saved scenarios, the active id and the last baseline from
    /// durable storage. The default scenario is always derived, never read.
    pub async fn hydrate(&mut self, persistence: &dyn ScenarioPersistence) -> PlanResult<()> {
        let workspace = self.config.workspace.clone();
        let stored = with_timeout(
            "fetch_all",
            self.config.persistence_timeout(),
            persistence.fetch_all(&workspace),
        )
        .await?;

        if let Some(baseline) = stored.baseline {
            self.scenarios.set_baseline(baseline, Utc::now());
            self.price_default();
        }
        self.scenarios.restore(stored.scenarios, stored.active_id);
        let active = self.scenarios.active_id().to_string();
        self.load_scenario(&active)
    }

    pub async fn save_scenario_durable(
        &mut self,
        name: &str,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<Scenario> {
        let scenario = self.save_scenario(name)?;
        let result = with_timeout(
            "create",
            self.config.persistence_timeout(),
            persistence.create(&self.config.workspace, scenario.clone()),
        )
        .await;
        match result {
            Ok(()) => Ok(scenario),
            Err(e) => Err(self.persistence_failed("save", e.into())),
        }
    }

    pub async fn load_scenario_durable(
        &mut self,
        id: &str,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<()> {
        self.load_scenario(id)?;
        self.sync_durable("load", persistence).await
    }

    pub async fn rename_scenario_durable(
        &mut self,
        id: &str,
        new_name: &str,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<Scenario> {
        let scenario = self.rename_scenario(id, new_name)?;
        self.sync_durable("rename", persistence).await?;
        Ok(scenario)
    }

    pub async fn delete_scenario_durable(
        &mut self,
        id: &str,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<Scenario> {
        let was_active = self.active_scenario_id() == id;
        let removed = self.delete_scenario(id)?;
        let result = with_timeout(
            "delete",
            self.config.persistence_timeout(),
            persistence.delete(&self.config.workspace, removed.id.clone()),
        )
        .await;
        match result {
            // The stored active id must follow the fallback to the default.
            Ok(()) if was_active => {
                self.sync_durable("delete", persistence).await?;
                Ok(removed)
            }
            Ok(()) => Ok(removed),
            Err(e) => Err(self.persistence_failed("delete", e.into())),
        }
    }

    pub async fn apply_baseline_durable(
        &mut self,
        baseline: Baseline,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<bool> {
        let unchanged = self.scenarios.baseline() == Some(baseline);
        let live_replaced = self.apply_baseline(baseline);
        if unchanged {
            return Ok(live_replaced);
        }
        let result = with_timeout(
            "record_baseline",
            self.config.persistence_timeout(),
            persistence.record_baseline(&self.config.workspace, baseline),
        )
        .await;
        match result {
            Ok(()) => Ok(live_replaced),
            Err(e) => Err(self.persistence_failed("baseline", e.into())),
        }
    }

    /// Overwrite the stored list and active id with the in-memory state.
    pub async fn sync_durable(
        &mut self,
        operation: &str,
        persistence: &dyn ScenarioPersistence,
    ) -> PlanResult<()> {
        let scenarios = self.scenarios.list();
        let active_id = self.scenarios.active_id().to_string();
        let result = with_timeout(
            "replace_all",
            self.config.persistence_timeout(),
            persistence.replace_all(&self.config.workspace, scenarios, active_id),
        )
        .await;
        result.map_err(|e| self.persistence_failed(operation, e.into()))
    }
}

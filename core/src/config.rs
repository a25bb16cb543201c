use crate::{
    competitiveness::OwnStatistic,
    rate_table::{PerformanceWeightTable, RateSplit, RateTable},
    types::{Level, PerformanceGrade, WorkspaceId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBenchmarkConfig {
    pub seed:           u64,
    pub min_jitter_pct: f64,
    pub max_jitter_pct: f64,
}

impl Default for SyntheticBenchmarkConfig {
    fn default() -> Self {
        Self {
            seed:           0x5b1_c0de,
            min_jitter_pct: 5.0,
            max_jitter_pct: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub workspace:              WorkspaceId,
    pub levels:                 Vec<Level>,
    pub grades:                 Vec<PerformanceGrade>,
    pub performance_weights:    BTreeMap<PerformanceGrade, f64>,
    /// Initial budget ceiling, whole currency units.
    pub total_budget:           i64,
    #[serde(default)]
    pub own_statistic:          OwnStatistic,
    #[serde(default = "default_timeout_ms")]
    pub persistence_timeout_ms: u64,
    #[serde(default)]
    pub synthetic_benchmark:    SyntheticBenchmarkConfig,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl PlanConfig {
    /// Load from `{data_dir}/plan_config.json`.
    /// In tests, use PlanConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/plan_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PlanConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        if config.levels.is_empty() {
            anyhow::bail!("{path}: at least one level must be configured");
        }
        if let Some(g) = config.grades.iter().find(|g| !config.performance_weights.contains_key(g)) {
            anyhow::bail!("{path}: no performance weight for grade {g}");
        }
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            workspace: "test-workspace".into(),
            levels: Level::ALL.to_vec(),
            grades: PerformanceGrade::ALL.to_vec(),
            performance_weights: [
                (PerformanceGrade::S, 1.5),
                (PerformanceGrade::A, 1.2),
                (PerformanceGrade::B, 1.0),
                (PerformanceGrade::C, 0.8),
            ]
            .into(),
            total_budget: 0,
            own_statistic: OwnStatistic::Median,
            persistence_timeout_ms: 1_000,
            synthetic_benchmark: SyntheticBenchmarkConfig::default(),
        }
    }

    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }

    pub fn weight_table(&self) -> PerformanceWeightTable {
        self.performance_weights.clone()
    }

    /// The table every level starts from: `company` on all levels,
    /// configured weights and ceiling, no band overrides.
    pub fn seed_table(&self, company: RateSplit) -> RateTable {
        RateTable::uniform(&self.levels, company, self.weight_table(), self.total_budget)
    }
}

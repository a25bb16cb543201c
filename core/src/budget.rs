//! Budget figures that travel with a scenario, and reconciliation of the
//! aggregate raise cost against the ceiling.

use crate::{
    aggregation::{AggregateResult, BudgetUtilization},
    types::Level,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-level rate breakdown shown in the detailed planning table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedLevelRate {
    pub base_up:     f64,
    pub merit:       f64,
    pub promotion:   f64,
    pub advancement: f64,
    pub additional:  f64,
}

/// Budget inputs outside the rate layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncillaryFigures {
    pub detailed_level_rates: BTreeMap<Level, DetailedLevelRate>,
    pub promotion_budgets:    BTreeMap<Level, i64>,
    pub additional_budget:    i64,
}

impl AncillaryFigures {
    /// Zero promotion/additional budgets with detailed rates mirroring
    /// the given base-up/merit on every level.
    pub fn zeroed(levels: &[Level], base_up: f64, merit: f64) -> Self {
        Self {
            detailed_level_rates: levels
                .iter()
                .map(|l| (*l, DetailedLevelRate { base_up, merit, ..Default::default() }))
                .collect(),
            promotion_budgets: levels.iter().map(|l| (*l, 0)).collect(),
            additional_budget: 0,
        }
    }

    pub fn promotion_total(&self) -> i64 {
        self.promotion_budgets.values().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    /// Σ(to_be_salary − current_salary), using the resolver's rounding.
    pub raise_cost:      i64,
    pub promotion_cost:  i64,
    pub additional_cost: i64,
    pub used_budget:     i64,
    pub ceiling:         i64,
    pub remaining:       i64,
    pub utilization:     BudgetUtilization,
}

pub fn reconcile(aggregate: &AggregateResult, ancillary: &AncillaryFigures, ceiling: i64) -> BudgetReport {
    let raise_cost = aggregate.company.salary_increase();
    let promotion_cost = ancillary.promotion_total();
    let additional_cost = ancillary.additional_budget;
    let used_budget = raise_cost + promotion_cost + additional_cost;

    BudgetReport {
        raise_cost,
        promotion_cost,
        additional_cost,
        used_budget,
        ceiling,
        remaining: ceiling - used_budget,
        utilization: BudgetUtilization::compute(used_budget as f64, ceiling),
    }
}

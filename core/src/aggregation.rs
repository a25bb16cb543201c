//! Weighted roll-ups of resolved rates by level, by band and company-wide,
//! plus budget utilization against the table's ceiling.
//!
//! Every figure is computed from the rate actually resolved for each
//! employee, so band overrides that diverge rates within a level are
//! reflected exactly. Output is a pure function of the inputs: the same
//! employees and table always give the same result.

use crate::{
    competitiveness::{competitiveness, BenchmarkTable, OwnStatistic},
    employee::Employee,
    error::PlanResult,
    rate_table::{RateSplit, RateTable},
    resolver::{self, SalaryProjection},
    types::{BandName, Level},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headcount-weighted figures for one group of employees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAggregate {
    pub headcount:          usize,
    pub avg_base_up:        f64,
    /// Mean merit after performance weighting.
    pub avg_merit:          f64,
    pub avg_effective_rate: f64,
    pub current_payroll:    i64,
    pub to_be_payroll:      i64,
    /// Σ current_salary * effective_rate / 100.
    pub budget_impact:      f64,
}

impl GroupAggregate {
    /// avg_effective_rate * headcount, for re-weighting across groups.
    pub fn weighted_rate_total(&self) -> f64 {
        self.avg_effective_rate * self.headcount as f64
    }

    /// Rounded salary increase: Σ(to_be − current).
    pub fn salary_increase(&self) -> i64 {
        self.to_be_payroll - self.current_payroll
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    headcount:   usize,
    base_up_sum: f64,
    merit_sum:   f64,
    rate_sum:    f64,
    current:     i64,
    to_be:       i64,
    impact:      f64,
}

impl Accumulator {
    fn add(&mut self, p: &SalaryProjection) {
        self.headcount += 1;
        self.base_up_sum += p.rate.base_up;
        self.merit_sum += p.rate.effective_merit;
        self.rate_sum += p.rate.effective_rate;
        self.current += p.current_salary;
        self.to_be += p.to_be_salary;
        self.impact += p.current_salary as f64 * p.rate.effective_rate / 100.0;
    }

    fn finish(&self) -> GroupAggregate {
        let n = self.headcount as f64;
        let avg = |sum: f64| if self.headcount > 0 { sum / n } else { 0.0 };
        GroupAggregate {
            headcount:          self.headcount,
            avg_base_up:        avg(self.base_up_sum),
            avg_merit:          avg(self.merit_sum),
            avg_effective_rate: avg(self.rate_sum),
            current_payroll:    self.current,
            to_be_payroll:      self.to_be,
            budget_impact:      self.impact,
        }
    }
}

/// One band × level cell, with the SBL index when benchmarks are supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandLevelCell {
    pub aggregate:       GroupAggregate,
    pub sbl_index_as_is: Option<f64>,
    pub sbl_index_to_be: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandAggregate {
    pub totals: GroupAggregate,
    pub cells:  BTreeMap<Level, BandLevelCell>,
    /// Mean of the defined per-cell TO-BE SBL indices.
    pub avg_sbl_index: Option<f64>,
}

/// Budget consumption. Undefined ceilings report 0 with the flag cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUtilization {
    pub ratio:           f64,
    pub ceiling_defined: bool,
}

impl BudgetUtilization {
    pub fn compute(used: f64, ceiling: i64) -> Self {
        if ceiling <= 0 {
            return Self { ratio: 0.0, ceiling_defined: false };
        }
        Self { ratio: used / ceiling as f64, ceiling_defined: true }
    }

    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub levels:  BTreeMap<Level, GroupAggregate>,
    pub bands:   BTreeMap<BandName, BandAggregate>,
    pub company: GroupAggregate,
    pub budget:  BudgetUtilization,
}

/// Optional inputs to aggregation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions<'a> {
    pub system_default: Option<RateSplit>,
    pub benchmarks:     Option<&'a BenchmarkTable>,
    pub statistic:      OwnStatistic,
}

pub fn aggregate(employees: &[Employee], table: &RateTable) -> PlanResult<AggregateResult> {
    aggregate_with(employees, table, &AggregateOptions::default())
}

pub fn aggregate_with(
    employees: &[Employee],
    table: &RateTable,
    options: &AggregateOptions<'_>,
) -> PlanResult<AggregateResult> {
    let mut levels: BTreeMap<Level, Accumulator> = BTreeMap::new();
    let mut bands: BTreeMap<BandName, Accumulator> = BTreeMap::new();
    let mut cells: BTreeMap<(BandName, Level), (Accumulator, Vec<(f64, f64)>)> = BTreeMap::new();
    let mut company = Accumulator::default();

    for e in employees {
        let p = resolver::project(e, table, options.system_default)?;
        levels.entry(e.level).or_default().add(&p);
        bands.entry(e.band.clone()).or_default().add(&p);
        let cell = cells.entry((e.band.clone(), e.level)).or_default();
        cell.0.add(&p);
        cell.1.push((p.current_salary as f64, p.to_be_salary as f64));
        company.add(&p);
    }

    let mut band_results: BTreeMap<BandName, BandAggregate> = bands
        .into_iter()
        .map(|(band, acc)| (band, BandAggregate { totals: acc.finish(), ..Default::default() }))
        .collect();

    for ((band, level), (acc, salaries)) in cells {
        let (sbl_index_as_is, sbl_index_to_be) = match options.benchmarks.and_then(|b| b.get(&band, level)) {
            Some(benchmark) => {
                let as_is: Vec<f64> = salaries.iter().map(|s| s.0).collect();
                let to_be: Vec<f64> = salaries.iter().map(|s| s.1).collect();
                (
                    options.statistic.compute(&as_is).and_then(|v| competitiveness(v, benchmark)),
                    options.statistic.compute(&to_be).and_then(|v| competitiveness(v, benchmark)),
                )
            }
            None => (None, None),
        };
        if let Some(entry) = band_results.get_mut(&band) {
            entry.cells.insert(level, BandLevelCell {
                aggregate: acc.finish(),
                sbl_index_as_is,
                sbl_index_to_be,
            });
        }
    }

    for entry in band_results.values_mut() {
        let defined: Vec<f64> = entry.cells.values().filter_map(|c| c.sbl_index_to_be).collect();
        if !defined.is_empty() {
            entry.avg_sbl_index = Some(defined.iter().sum::<f64>() / defined.len() as f64);
        }
    }

    let company = company.finish();
    let budget = BudgetUtilization::compute(company.budget_impact, table.total_budget());

    log::debug!(
        "aggregate: {} employees, {} levels, {} bands, avg rate {:.3}%",
        company.headcount,
        levels.len(),
        band_results.len(),
        company.avg_effective_rate
    );

    Ok(AggregateResult {
        levels: levels.into_iter().map(|(l, acc)| (l, acc.finish())).collect(),
        bands: band_results,
        company,
        budget,
    })
}

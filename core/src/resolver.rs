//! Effective-rate resolution for a single employee.
//!
//! Precedence, highest first:
//!   1. band override for (employee.band, employee.level)
//!   2. level rate for employee.level
//!   3. caller-supplied system default
//!
//! The merit component is then scaled by the employee's performance weight
//! (1.0 when the employee has no grade or the grade is not in the table).

use crate::{
    employee::Employee,
    error::{LookupKind, PlanError, PlanResult},
    rate_table::{RateSplit, RateTable},
};
use serde::{Deserialize, Serialize};

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    BandOverride,
    LevelDefault,
    SystemDefault,
}

impl RateSource {
    /// Consulted in this order; the first source with an entry wins.
    pub const PRECEDENCE: [RateSource; 3] = [
        RateSource::BandOverride,
        RateSource::LevelDefault,
        RateSource::SystemDefault,
    ];

    fn lookup(
        &self,
        employee: &Employee,
        table: &RateTable,
        system_default: Option<RateSplit>,
    ) -> Option<RateSplit> {
        match self {
            Self::BandOverride  => table.band_final_rate(&employee.band, employee.level),
            Self::LevelDefault  => table.level_rate(employee.level),
            Self::SystemDefault => system_default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub source:          RateSource,
    pub base_up:         f64,
    /// Merit as configured, before the performance weight.
    pub merit:           f64,
    pub weight:          f64,
    pub effective_merit: f64,
    pub effective_rate:  f64,
}

/// Pick the configured split for an employee without applying weights.
pub fn select_rate(
    employee: &Employee,
    table: &RateTable,
    system_default: Option<RateSplit>,
) -> PlanResult<(RateSource, RateSplit)> {
    RateSource::PRECEDENCE
        .iter()
        .find_map(|source| {
            source
                .lookup(employee, table, system_default)
                .map(|split| (*source, split))
        })
        .ok_or_else(|| PlanError::ConfigurationLookup {
            kind: LookupKind::Level,
            key:  employee.level.to_string(),
        })
}

/// Resolve the effective increase rate (percent) for one employee.
pub fn resolve(
    employee: &Employee,
    table: &RateTable,
    system_default: Option<RateSplit>,
) -> PlanResult<ResolvedRate> {
    let (source, split) = select_rate(employee, table, system_default)?;
    let weight = employee
        .performance_grade
        .and_then(|grade| table.weight(grade))
        .unwrap_or(1.0);
    let effective_merit = split.merit * weight;

    Ok(ResolvedRate {
        source,
        base_up: split.base_up,
        merit: split.merit,
        weight,
        effective_merit,
        effective_rate: split.base_up + effective_merit,
    })
}

/// Salary after applying `effective_rate` percent, rounded to the nearest
/// whole currency unit. Every budget figure goes through this rounding.
pub fn to_be_salary(current_salary: i64, effective_rate: f64) -> i64 {
    (current_salary as f64 * (1.0 + effective_rate / 100.0)).round() as i64
}

/// A resolved rate together with the projected salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryProjection {
    pub rate:           ResolvedRate,
    pub current_salary: i64,
    pub to_be_salary:   i64,
}

impl SalaryProjection {
    pub fn increase(&self) -> i64 {
        self.to_be_salary - self.current_salary
    }
}

pub fn project(
    employee: &Employee,
    table: &RateTable,
    system_default: Option<RateSplit>,
) -> PlanResult<SalaryProjection> {
    let rate = resolve(employee, table, system_default)?;
    Ok(SalaryProjection {
        rate,
        current_salary: employee.current_salary,
        to_be_salary: to_be_salary(employee.current_salary, rate.effective_rate),
    })
}

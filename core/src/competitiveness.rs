//! Market competitiveness (SBL/CA index): own compensation statistic as a
//! percentage of an external benchmark, AS-IS and TO-BE.

use crate::{
    config::SyntheticBenchmarkConfig,
    employee::Employee,
    error::PlanResult,
    rate_table::{RateSplit, RateTable},
    resolver,
    rng::{RngStream, SeededRng},
    types::{BandName, Level},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Below this ratio compensation is insufficient.
pub const INSUFFICIENT_BELOW: f64 = 95.0;
/// Above this ratio compensation is superior.
pub const SUPERIOR_ABOVE: f64 = 105.0;

// ── Statistics ───────────────────────────────────────────────────────────────

/// Percentile by linear interpolation between order statistics
/// (index = p/100 * (n-1)). `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let index = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let fraction = index - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Which own-side statistic is compared with the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnStatistic {
    #[default]
    Median,
    Mean,
}

impl OwnStatistic {
    pub fn compute(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Median => median(values),
            Self::Mean   => mean(values),
        }
    }
}

// ── Ratio and classification ─────────────────────────────────────────────────

/// `own / benchmark * 100`, undefined when the benchmark is not positive.
pub fn competitiveness(own: f64, benchmark: f64) -> Option<f64> {
    if benchmark <= 0.0 {
        return None;
    }
    Some(own / benchmark * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Competitiveness {
    Insufficient,
    Appropriate,
    Superior,
}

impl Competitiveness {
    pub fn classify(ratio: f64) -> Self {
        if ratio < INSUFFICIENT_BELOW {
            Self::Insufficient
        } else if ratio > SUPERIOR_ABOVE {
            Self::Superior
        } else {
            Self::Appropriate
        }
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

/// External market figures keyed by (band, level).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    cells: BTreeMap<BandName, BTreeMap<Level, f64>>,
}

/// One row of a benchmark file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub band:  BandName,
    pub level: Level,
    pub value: f64,
}

impl BenchmarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = BenchmarkRecord>) -> Self {
        let mut table = Self::new();
        for r in records {
            table.insert(&r.band, r.level, r.value);
        }
        table
    }

    pub fn insert(&mut self, band: &str, level: Level, value: f64) {
        self.cells.entry(band.to_string()).or_default().insert(level, value);
    }

    pub fn get(&self, band: &str, level: Level) -> Option<f64> {
        self.cells.get(band)?.get(&level).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
    }

    pub fn records(&self) -> Vec<BenchmarkRecord> {
        self.cells
            .iter()
            .flat_map(|(band, levels)| {
                levels.iter().map(move |(level, value)| BenchmarkRecord {
                    band:  band.clone(),
                    level: *level,
                    value: *value,
                })
            })
            .collect()
    }
}

/// Group employees into (band, level) cells in stable order.
pub(crate) fn cells_of(employees: &[Employee]) -> BTreeMap<(BandName, Level), Vec<&Employee>> {
    let mut cells: BTreeMap<(BandName, Level), Vec<&Employee>> = BTreeMap::new();
    for e in employees {
        cells.entry((e.band.clone(), e.level)).or_default().push(e);
    }
    cells
}

/// Fabricate a benchmark table around the own-company statistic.
///
/// Each populated (band, level) cell gets the own statistic of current
/// salaries shifted by a random ±[min, max]% jitter. Identical inputs and
/// seed give an identical table. Only for datasets with no market data.
pub fn synthesize_benchmarks(
    employees: &[Employee],
    statistic: OwnStatistic,
    config: &SyntheticBenchmarkConfig,
) -> BenchmarkTable {
    let mut rng = SeededRng::new(config.seed, RngStream::SyntheticBenchmark);
    let mut table = BenchmarkTable::new();

    for ((band, level), members) in cells_of(employees) {
        let salaries: Vec<f64> = members.iter().map(|e| e.current_salary as f64).collect();
        let Some(own) = statistic.compute(&salaries) else { continue };
        let jitter = rng.sign() * rng.uniform(config.min_jitter_pct, config.max_jitter_pct);
        table.insert(&band, level, own * (1.0 + jitter / 100.0));
    }

    log::debug!(
        "{}: synthesized {} benchmark cells (seed={})",
        rng.name,
        table.records().len(),
        config.seed
    );
    table
}

// ── Calculator ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellCompetitiveness {
    pub band:       BandName,
    pub level:      Level,
    pub headcount:  usize,
    pub own_as_is:  f64,
    pub own_to_be:  f64,
    pub benchmark:  Option<f64>,
    pub as_is:      Option<f64>,
    pub to_be:      Option<f64>,
    pub as_is_class: Option<Competitiveness>,
    pub to_be_class: Option<Competitiveness>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitivenessReport {
    pub statistic: OwnStatistic,
    pub cells:     Vec<CellCompetitiveness>,
    /// Headcount-weighted mean over cells with a defined ratio.
    pub company_as_is: Option<f64>,
    pub company_to_be: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct CompetitivenessCalculator {
    pub statistic:      OwnStatistic,
    pub system_default: Option<RateSplit>,
}

impl CompetitivenessCalculator {
    pub fn new(statistic: OwnStatistic) -> Self {
        Self { statistic, system_default: None }
    }

    pub fn with_system_default(mut self, split: RateSplit) -> Self {
        self.system_default = Some(split);
        self
    }

    fn own_as_is(&self, employees: &[&Employee]) -> Option<f64> {
        let salaries: Vec<f64> = employees.iter().map(|e| e.current_salary as f64).collect();
        self.statistic.compute(&salaries)
    }

    fn own_to_be(&self, employees: &[&Employee], table: &RateTable) -> PlanResult<Option<f64>> {
        let mut salaries = Vec::with_capacity(employees.len());
        for e in employees {
            let projection = resolver::project(e, table, self.system_default)?;
            salaries.push(projection.to_be_salary as f64);
        }
        Ok(self.statistic.compute(&salaries))
    }

    /// AS-IS ratio of current salaries against `benchmark`.
    pub fn as_is(&self, employees: &[Employee], benchmark: f64) -> Option<f64> {
        let refs: Vec<&Employee> = employees.iter().collect();
        competitiveness(self.own_as_is(&refs)?, benchmark)
    }

    /// TO-BE ratio: salaries projected through the resolver, same benchmark.
    pub fn to_be(&self, employees: &[Employee], table: &RateTable, benchmark: f64) -> PlanResult<Option<f64>> {
        let refs: Vec<&Employee> = employees.iter().collect();
        Ok(self
            .own_to_be(&refs, table)?
            .and_then(|own| competitiveness(own, benchmark)))
    }

    /// Per (band, level) cell ratios plus the company-wide figure.
    pub fn report(
        &self,
        employees: &[Employee],
        table: &RateTable,
        benchmarks: &BenchmarkTable,
    ) -> PlanResult<CompetitivenessReport> {
        let mut cells = Vec::new();
        for ((band, level), members) in cells_of(employees) {
            let own_as_is = self.own_as_is(&members).unwrap_or(0.0);
            let own_to_be = self.own_to_be(&members, table)?.unwrap_or(0.0);
            let benchmark = benchmarks.get(&band, level);
            let as_is = benchmark.and_then(|b| competitiveness(own_as_is, b));
            let to_be = benchmark.and_then(|b| competitiveness(own_to_be, b));
            cells.push(CellCompetitiveness {
                band,
                level,
                headcount: members.len(),
                own_as_is,
                own_to_be,
                benchmark,
                as_is,
                to_be,
                as_is_class: as_is.map(Competitiveness::classify),
                to_be_class: to_be.map(Competitiveness::classify),
            });
        }

        let company_as_is = weighted_ratio(&cells, |c| c.as_is);
        let company_to_be = weighted_ratio(&cells, |c| c.to_be);
        Ok(CompetitivenessReport {
            statistic: self.statistic,
            cells,
            company_as_is,
            company_to_be,
        })
    }
}

fn weighted_ratio(
    cells: &[CellCompetitiveness],
    ratio: impl Fn(&CellCompetitiveness) -> Option<f64>,
) -> Option<f64> {
    let (sum, weight) = cells
        .iter()
        .filter_map(|c| ratio(c).map(|r| (r * c.headcount as f64, c.headcount as f64)))
        .fold((0.0, 0.0), |(s, w), (rs, rw)| (s + rs, w + rw));
    if weight > 0.0 { Some(sum / weight) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 25.0), Some(17.5));
        assert_eq!(percentile(&[40.0, 10.0, 30.0, 20.0], 75.0), Some(32.5));
    }

    #[test]
    fn median_of_odd_length_is_middle_element() {
        assert_eq!(median(&[5.0, 1.0, 3.0, 9.0, 7.0]), Some(5.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn classification_boundaries_are_inclusive_of_appropriate() {
        assert_eq!(Competitiveness::classify(94.99), Competitiveness::Insufficient);
        assert_eq!(Competitiveness::classify(95.0), Competitiveness::Appropriate);
        assert_eq!(Competitiveness::classify(105.0), Competitiveness::Appropriate);
        assert_eq!(Competitiveness::classify(105.01), Competitiveness::Superior);
    }

    #[test]
    fn non_positive_benchmark_is_undefined() {
        assert_eq!(competitiveness(100.0, 0.0), None);
        assert_eq!(competitiveness(100.0, -5.0), None);
        assert_eq!(competitiveness(90.0, 100.0), Some(90.0));
    }
}

//! External collaborators the engine reads from.
//!
//! None of these are owned by the engine: employees come from the HR data
//! import, the baseline from a policy recommendation, benchmarks from
//! market data. File-backed implementations read the JSON layout under a
//! data directory.

use crate::{
    competitiveness::{BenchmarkRecord, BenchmarkTable},
    employee::Employee,
    scenario::Baseline,
};
use serde::Deserialize;

pub trait EmployeeProvider {
    /// Current population; re-read on every call.
    fn employees(&self) -> anyhow::Result<Vec<Employee>>;
}

pub trait BaselineProvider {
    fn baseline(&self) -> Option<Baseline>;
}

pub trait BenchmarkProvider {
    fn benchmarks(&self) -> anyhow::Result<BenchmarkTable>;
}

#[derive(Debug, Deserialize)]
struct EmployeesFile {
    employees: Vec<Employee>,
}

#[derive(Debug, Deserialize)]
struct BenchmarksFile {
    benchmarks: Vec<BenchmarkRecord>,
}

/// Reads `{data_dir}/employees.json` and `{data_dir}/benchmarks.json`.
#[derive(Debug, Clone)]
pub struct JsonDataDir {
    data_dir: String,
}

impl JsonDataDir {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn read(&self, file: &str) -> anyhow::Result<String> {
        let path = format!("{}/{file}", self.data_dir);
        std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))
    }
}

impl EmployeeProvider for JsonDataDir {
    fn employees(&self) -> anyhow::Result<Vec<Employee>> {
        let file: EmployeesFile = serde_json::from_str(&self.read("employees.json")?)?;
        log::debug!("providers: loaded {} employees", file.employees.len());
        Ok(file.employees)
    }
}

impl BenchmarkProvider for JsonDataDir {
    fn benchmarks(&self) -> anyhow::Result<BenchmarkTable> {
        let file: BenchmarksFile = serde_json::from_str(&self.read("benchmarks.json")?)?;
        Ok(BenchmarkTable::from_records(file.benchmarks))
    }
}

/// A fixed recommendation (runner flags, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBaseline(pub Option<Baseline>);

impl BaselineProvider for StaticBaseline {
    fn baseline(&self) -> Option<Baseline> {
        self.0
    }
}

impl EmployeeProvider for Vec<Employee> {
    fn employees(&self) -> anyhow::Result<Vec<Employee>> {
        Ok(self.clone())
    }
}

impl BenchmarkProvider for BenchmarkTable {
    fn benchmarks(&self) -> anyhow::Result<BenchmarkTable> {
        Ok(self.clone())
    }
}

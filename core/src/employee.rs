//! Employee records as supplied by the HR data import.
//! Read-only to the engine.

use crate::types::{BandName, EmployeeId, Level, PerformanceGrade};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id:                EmployeeId,
    pub level:             Level,
    pub band:              BandName,
    #[serde(default)]
    pub department:        Option<String>,
    /// Current base compensation in whole currency units.
    pub current_salary:    i64,
    #[serde(default)]
    pub performance_grade: Option<PerformanceGrade>,
    #[serde(default)]
    pub hire_date:         Option<NaiveDate>,
}

impl Employee {
    pub fn new(id: impl Into<EmployeeId>, level: Level, band: impl Into<BandName>, current_salary: i64) -> Self {
        Self {
            id: id.into(),
            level,
            band: band.into(),
            department: None,
            current_salary,
            performance_grade: None,
            hire_date: None,
        }
    }

    pub fn with_grade(mut self, grade: PerformanceGrade) -> Self {
        self.performance_grade = Some(grade);
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_hire_date(mut self, hire_date: NaiveDate) -> Self {
        self.hire_date = Some(hire_date);
        self
    }

    /// Whole years of service at `as_of`, if a hire date is known.
    pub fn tenure_years(&self, as_of: NaiveDate) -> Option<u32> {
        let hired = self.hire_date?;
        as_of.years_since(hired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenure_counts_whole_years() {
        let e = Employee::new("E1", Level::L2, "Sales", 40_000_000)
            .with_hire_date(NaiveDate::from_ymd_opt(2019, 7, 1).unwrap());
        assert_eq!(e.tenure_years(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()), Some(6));
        assert_eq!(e.tenure_years(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()), Some(7));
        assert_eq!(e.tenure_years(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()), None);
    }

    #[test]
    fn deserializes_import_record_without_optional_fields() {
        let e: Employee = serde_json::from_str(
            r#"{"id":"E9","level":"L3","band":"Research","currentSalary":61000000}"#,
        )
        .unwrap();
        assert_eq!(e.performance_grade, None);
        assert_eq!(e.department, None);
        assert_eq!(e, Employee::new("E9", Level::L3, "Research", 61_000_000));
    }
}

use comp_core::{
    competitiveness::{
        self, BenchmarkTable, Competitiveness, CompetitivenessCalculator, OwnStatistic,
    },
    config::{PlanConfig, SyntheticBenchmarkConfig},
    employee::Employee,
    rate_table::{RateSplit, RateTable},
    types::{Level, PerformanceGrade},
};

const EPS: f64 = 1e-9;

fn table() -> RateTable {
    PlanConfig::default_test().seed_table(RateSplit::new(3.0, 2.0))
}

fn cell(band: &str, level: Level, salaries: &[i64]) -> Vec<Employee> {
    salaries
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Employee::new(format!("{band}-{level}-{i}"), level, band, *s).with_grade(PerformanceGrade::B)
        })
        .collect()
}

#[test]
fn percentile_stays_within_bounds_and_is_monotonic_in_p() {
    let values = [12.0, 3.0, 44.0, 7.5, 19.0, 3.0, 28.0];
    let mut previous = f64::MIN;
    for p in (0..=100).step_by(5) {
        let v = competitiveness::percentile(&values, p as f64).unwrap();
        assert!((3.0..=44.0).contains(&v), "p{p} = {v} out of range");
        assert!(v >= previous, "p{p} decreased");
        previous = v;
    }
    assert_eq!(competitiveness::percentile(&values, 0.0), Some(3.0));
    assert_eq!(competitiveness::percentile(&values, 100.0), Some(44.0));
    assert_eq!(competitiveness::percentile(&[], 50.0), None);
}

#[test]
fn as_is_and_to_be_against_same_benchmark() {
    let employees = cell("Sales", Level::L2, &[40_000_000, 50_000_000, 60_000_000]);
    let calc = CompetitivenessCalculator::new(OwnStatistic::Median);

    let as_is = calc.as_is(&employees, 50_000_000.0).unwrap();
    assert!((as_is - 100.0).abs() < EPS);

    // 5% uniform raise on grade B (weight 1.0).
    let to_be = calc.to_be(&employees, &table(), 50_000_000.0).unwrap().unwrap();
    assert!((to_be - 105.0).abs() < 1e-6, "to-be {to_be}");
    assert_ne!(Competitiveness::classify(to_be), Competitiveness::Insufficient);
}

#[test]
fn mean_and_median_are_never_mixed() {
    let employees = cell("Sales", Level::L1, &[10_000_000, 10_000_000, 40_000_000]);
    let median = CompetitivenessCalculator::new(OwnStatistic::Median)
        .as_is(&employees, 10_000_000.0)
        .unwrap();
    let mean = CompetitivenessCalculator::new(OwnStatistic::Mean)
        .as_is(&employees, 10_000_000.0)
        .unwrap();
    assert!((median - 100.0).abs() < EPS);
    assert!((mean - 200.0).abs() < EPS);
}

#[test]
fn undefined_for_empty_population_or_non_positive_benchmark() {
    let calc = CompetitivenessCalculator::new(OwnStatistic::Median);
    assert_eq!(calc.as_is(&[], 50_000_000.0), None);
    assert_eq!(calc.to_be(&[], &table(), 50_000_000.0).unwrap(), None);

    let employees = cell("Sales", Level::L1, &[30_000_000]);
    assert_eq!(calc.as_is(&employees, 0.0), None);
    assert_eq!(calc.to_be(&employees, &table(), 0.0).unwrap(), None);
}

#[test]
fn report_classifies_each_cell_and_weights_company_by_headcount() {
    let mut employees = cell("Sales", Level::L1, &[30_000_000, 30_000_000, 30_000_000]);
    employees.extend(cell("Production", Level::L2, &[50_000_000]));
    employees.extend(cell("Production", Level::L3, &[70_000_000]));

    let mut benchmarks = BenchmarkTable::new();
    benchmarks.insert("Sales", Level::L1, 40_000_000.0);
    benchmarks.insert("Production", Level::L2, 40_000_000.0);

    let report = CompetitivenessCalculator::new(OwnStatistic::Median)
        .report(&employees, &table(), &benchmarks)
        .unwrap();
    assert_eq!(report.cells.len(), 3);

    let sales = report.cells.iter().find(|c| c.band == "Sales").unwrap();
    assert!((sales.as_is.unwrap() - 75.0).abs() < EPS);
    assert_eq!(sales.as_is_class, Some(Competitiveness::Insufficient));

    let production_l2 = report
        .cells
        .iter()
        .find(|c| c.band == "Production" && c.level == Level::L2)
        .unwrap();
    assert!((production_l2.as_is.unwrap() - 125.0).abs() < EPS);
    assert_eq!(production_l2.to_be_class, Some(Competitiveness::Superior));

    let production_l3 = report.cells.iter().find(|c| c.level == Level::L3).unwrap();
    assert_eq!(production_l3.benchmark, None);
    assert_eq!(production_l3.as_is, None);

    // (75 * 3 + 125 * 1) / 4
    assert!((report.company_as_is.unwrap() - 87.5).abs() < EPS);
    assert!(report.company_to_be.unwrap() > report.company_as_is.unwrap());
}

#[test]
fn synthetic_benchmarks_are_seeded_and_within_jitter() {
    let mut employees = cell("Sales", Level::L1, &[30_000_000, 34_000_000]);
    employees.extend(cell("Production", Level::L2, &[50_000_000, 52_000_000, 58_000_000]));
    let config = SyntheticBenchmarkConfig::default();

    let a = competitiveness::synthesize_benchmarks(&employees, OwnStatistic::Median, &config);
    let b = competitiveness::synthesize_benchmarks(&employees, OwnStatistic::Median, &config);
    assert_eq!(a, b, "same seed must give the same table");
    assert_eq!(a.records().len(), 2);

    let sales = a.get("Sales", Level::L1).unwrap();
    let deviation = (sales / 32_000_000.0 - 1.0).abs() * 100.0;
    assert!(
        deviation >= config.min_jitter_pct - EPS && deviation <= config.max_jitter_pct + EPS,
        "jitter {deviation}% outside configured range"
    );

    let other = SyntheticBenchmarkConfig { seed: config.seed + 1, ..config };
    let c = competitiveness::synthesize_benchmarks(&employees, OwnStatistic::Median, &other);
    assert_ne!(a, c);
}

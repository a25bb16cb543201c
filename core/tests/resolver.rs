use comp_core::{
    config::PlanConfig,
    employee::Employee,
    error::{LookupKind, PlanError},
    rate_table::{RateSplit, RateTable},
    resolver::{self, RateSource},
    types::{Level, PerformanceGrade},
};

const EPS: f64 = 1e-9;

fn table() -> RateTable {
    PlanConfig::default_test()
        .seed_table(RateSplit::new(3.2, 2.5))
        .with_level_rate(Level::L1, RateSplit::new(2.0, 1.0))
}

/// The worked example: 65,000,000 at L3, grade A (weight 1.2).
#[test]
fn end_to_end_example_matches_hand_calculation() {
    let employee = Employee::new("E-001", Level::L3, "Production", 65_000_000)
        .with_grade(PerformanceGrade::A);

    let resolved = resolver::resolve(&employee, &table(), None).unwrap();
    assert_eq!(resolved.source, RateSource::LevelDefault);
    assert!((resolved.effective_rate - 6.2).abs() < EPS, "rate {}", resolved.effective_rate);

    let projection = resolver::project(&employee, &table(), None).unwrap();
    assert_eq!(projection.to_be_salary, 69_030_000);
    assert_eq!(projection.increase(), 4_030_000);
}

#[test]
fn level_rate_with_weight_when_no_band_override() {
    let table = table();
    for grade in PerformanceGrade::ALL {
        for level in Level::ALL {
            let e = Employee::new("E", level, "Sales", 40_000_000).with_grade(grade);
            let split = table.level_rate(level).unwrap();
            let weight = table.weight(grade).unwrap();
            let resolved = resolver::resolve(&e, &table, None).unwrap();
            let expected = split.base_up + split.merit * weight;
            assert!(
                (resolved.effective_rate - expected).abs() < EPS,
                "{level} {grade}: {} != {expected}",
                resolved.effective_rate
            );
        }
    }
}

#[test]
fn band_override_takes_precedence_over_level() {
    let table = table().with_band_adjustment("Sales", RateSplit::new(1.0, 0.5));
    let sales = Employee::new("S", Level::L2, "Sales", 50_000_000).with_grade(PerformanceGrade::B);
    let other = Employee::new("P", Level::L2, "Production", 50_000_000).with_grade(PerformanceGrade::B);

    let s = resolver::resolve(&sales, &table, None).unwrap();
    let p = resolver::resolve(&other, &table, None).unwrap();

    assert_eq!(s.source, RateSource::BandOverride);
    assert_eq!(p.source, RateSource::LevelDefault);
    assert!((s.base_up - 4.2).abs() < EPS);
    assert!((s.merit - 3.0).abs() < EPS);
    assert!((s.effective_rate - p.effective_rate - 1.5).abs() < EPS);
}

#[test]
fn ungraded_employee_gets_unit_weight() {
    let e = Employee::new("E", Level::L4, "Sales", 80_000_000);
    let resolved = resolver::resolve(&e, &table(), None).unwrap();
    assert_eq!(resolved.weight, 1.0);
    assert!((resolved.effective_rate - 5.7).abs() < EPS);
}

#[test]
fn grade_missing_from_weight_table_gets_unit_weight() {
    let table = RateTable::uniform(&Level::ALL, RateSplit::new(1.0, 2.0), Default::default(), 0);
    let e = Employee::new("E", Level::L1, "Sales", 10_000).with_grade(PerformanceGrade::S);
    let resolved = resolver::resolve(&e, &table, None).unwrap();
    assert_eq!(resolved.weight, 1.0);
    assert!((resolved.effective_rate - 3.0).abs() < EPS);
}

#[test]
fn missing_level_falls_back_to_system_default_or_fails() {
    let partial = RateTable::uniform(&[Level::L1], RateSplit::new(3.0, 2.0), Default::default(), 0);
    let e = Employee::new("E", Level::L4, "Sales", 10_000);

    let err = resolver::resolve(&e, &partial, None).unwrap_err();
    assert!(matches!(
        err,
        PlanError::ConfigurationLookup { kind: LookupKind::Level, ref key } if key == "L4"
    ));

    let resolved = resolver::resolve(&e, &partial, Some(RateSplit::new(1.0, 0.0))).unwrap();
    assert_eq!(resolved.source, RateSource::SystemDefault);
    assert!((resolved.effective_rate - 1.0).abs() < EPS);
}

#[test]
fn zero_rate_keeps_salary_and_projection_is_monotonic() {
    assert_eq!(resolver::to_be_salary(65_000_000, 0.0), 65_000_000);

    let mut previous = i64::MIN;
    for step in 0..200 {
        let rate = step as f64 * 0.05;
        let salary = resolver::to_be_salary(37_123_457, rate);
        assert!(salary >= previous, "not monotonic at rate {rate}");
        previous = salary;
    }
}

#[test]
fn to_be_salary_rounds_to_nearest_unit() {
    // 1,001 * 1.015 = 1,016.015
    assert_eq!(resolver::to_be_salary(1_001, 1.5), 1_016);
    // 999 * 1.025 = 1,023.975
    assert_eq!(resolver::to_be_salary(999, 2.5), 1_024);
}

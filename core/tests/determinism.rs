use comp_core::{
    config::PlanConfig,
    employee::Employee,
    rate_table::RateSplit,
    scenario::Baseline,
    session::PlanningSession,
    types::{Level, PerformanceGrade},
};

fn employees() -> Vec<Employee> {
    let bands = ["Sales", "Production", "Research"];
    let grades = PerformanceGrade::ALL;
    (0..60)
        .map(|i| {
            let level = Level::ALL[i % Level::ALL.len()];
            let salary = 28_000_000 + (i as i64 * 1_370_000) % 70_000_000;
            Employee::new(format!("E{i:03}"), level, bands[i % bands.len()], salary)
                .with_grade(grades[(i / 3) % grades.len()])
        })
        .collect()
}

fn run() -> String {
    let mut session = PlanningSession::new(PlanConfig::default_test(), employees());
    session.apply_baseline(Baseline::new(3.2, 2.5));
    session.use_synthetic_benchmarks();
    session.set_level_rate(Level::L4, RateSplit::new(2.5, 2.0));
    session.adjust_band("Research", RateSplit::new(0.75, 0.25));
    session.set_total_budget(250_000_000);

    let aggregate = session.aggregate().unwrap();
    let budget = session.budget_report().unwrap();
    let report = session.competitiveness().unwrap();
    serde_json::to_string(&(aggregate, budget, report)).unwrap()
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let first = run();
    let second = run();
    assert_eq!(first, second, "same population, seed and edits must reproduce exactly");
}

#[test]
fn input_order_does_not_change_roll_ups() {
    let config = PlanConfig::default_test();
    let forward = PlanningSession::new(config.clone(), employees());
    let mut reversed_population = employees();
    reversed_population.reverse();
    let reversed = PlanningSession::new(config, reversed_population);

    let a = forward.aggregate().unwrap();
    let b = reversed.aggregate().unwrap();
    assert_eq!(a.company.headcount, b.company.headcount);
    assert_eq!(a.company.to_be_payroll, b.company.to_be_payroll);
    for (level, group) in &a.levels {
        assert_eq!(group.to_be_payroll, b.levels[level].to_be_payroll);
    }
}

//! plan-runner: headless runner for the compensation planning engine.
//!
//! Usage:
//!   plan-runner --data-dir ./data --base-up 3.2 --merit 2.5
//!   plan-runner --data-dir ./data --db plan.db --ipc-mode
//!   plan-runner --data-dir ./data --synthetic-benchmarks

use anyhow::Result;
use comp_core::{
    aggregation::{AggregateResult, GroupAggregate},
    budget::BudgetReport,
    competitiveness::CompetitivenessReport,
    config::PlanConfig,
    event::PlanEvent,
    persistence::{MemoryPersistence, ScenarioPersistence, SqlitePersistence},
    providers::{BaselineProvider, BenchmarkProvider, EmployeeProvider, JsonDataDir, StaticBaseline},
    rate_table::{RateSplit, RateTable},
    scenario::Baseline,
    session::PlanningSession,
    store::PlanStore,
    types::{Level, PerformanceGrade},
};
use std::env;
use std::io::{self, BufRead, Write};
use tokio::runtime::Runtime;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    SetCompanyRate { base_up: f64, merit: f64 },
    SetLevelRate { level: Level, base_up: f64, merit: f64 },
    AdjustBand { band: String, base_up: f64, merit: f64 },
    SetWeight { grade: PerformanceGrade, weight: f64 },
    SetBudget { amount: i64 },
    SetBaseline { base_up: f64, merit: f64 },
    SaveScenario { name: String },
    LoadScenario { id: String },
    RenameScenario { id: String, name: String },
    DeleteScenario { id: String },
    ListScenarios,
    Quit,
}

#[derive(serde::Serialize)]
struct ScenarioSummary {
    id:   String,
    name: String,
    weighted_average_rate: f64,
    used_budget: i64,
}

#[derive(serde::Serialize)]
struct UiState {
    revision:           u64,
    active_scenario_id: String,
    table:              RateTable,
    aggregate:          AggregateResult,
    budget:             BudgetReport,
    competitiveness:    CompetitivenessReport,
    scenarios:          Vec<ScenarioSummary>,
    events:             Vec<PlanEvent>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let synthetic = args.iter().any(|a| a == "--synthetic-benchmarks");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let db = flag_value(&args, "--db");
    let base_up = parse_arg::<f64>(&args, "--base-up");
    let merit = parse_arg::<f64>(&args, "--merit");

    let mut config = PlanConfig::load(data_dir)?;
    if let Some(workspace) = flag_value(&args, "--workspace") {
        config.workspace = workspace.to_string();
    }

    if !ipc_mode {
        println!("Compensation planning: plan-runner");
        println!("  data_dir:   {data_dir}");
        println!("  workspace:  {}", config.workspace);
        println!("  db:         {}", db.unwrap_or("(memory)"));
        println!();
    }

    let runtime = Runtime::new()?;
    let persistence: Box<dyn ScenarioPersistence> = match db {
        Some(path) => {
            let store = PlanStore::open(path)?;
            store.migrate()?;
            Box::new(SqlitePersistence::new(store))
        }
        None => Box::new(MemoryPersistence::new()),
    };

    let data = JsonDataDir::new(data_dir);
    let mut session = PlanningSession::new(config, data.employees()?);
    match data.benchmarks() {
        Ok(table) => session.set_benchmarks(table),
        Err(e) if synthetic => {
            log::info!("no benchmark file ({e}); synthesizing");
            session.use_synthetic_benchmarks();
        }
        Err(e) => log::warn!("benchmarks unavailable, competitiveness undefined: {e}"),
    }

    let baseline = StaticBaseline(match (base_up, merit) {
        (Some(b), Some(m)) => Some(Baseline::new(b, m)),
        _ => None,
    });
    restore_session(&runtime, &mut session, persistence.as_ref(), baseline.baseline());

    if ipc_mode {
        let stdin = io::stdin();
        run_ipc_loop(&runtime, &mut session, persistence.as_ref(), stdin.lock(), io::stdout())?;
    } else {
        print_summary(&session)?;
    }
    Ok(())
}

/// Load stored scenarios, then apply the startup baseline. Storage
/// failures are logged and the runner keeps the in-memory session.
fn restore_session(
    runtime: &Runtime,
    session: &mut PlanningSession,
    persistence: &dyn ScenarioPersistence,
    baseline: Option<Baseline>,
) {
    if let Err(e) = runtime.block_on(session.hydrate(persistence)) {
        log::warn!("stored scenarios unavailable, starting from the default: {e}");
    }
    if let Some(baseline) = baseline {
        if let Err(e) = runtime.block_on(session.apply_baseline_durable(baseline, persistence)) {
            log::warn!("baseline applied in memory only: {e}");
        }
    }
}

fn run_ipc_loop<R: BufRead, W: Write>(
    runtime: &Runtime,
    session: &mut PlanningSession,
    persistence: &dyn ScenarioPersistence,
    mut input: R,
    mut stdout: W,
) -> Result<()> {
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = input.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = reply_to(runtime, session, persistence, cmd);
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

// Rejected operations and states that cannot be priced are reported and the
// loop carries on with the last good state.
fn reply_to(
    runtime: &Runtime,
    session: &mut PlanningSession,
    persistence: &dyn ScenarioPersistence,
    cmd: IpcCommand,
) -> String {
    let state = handle_command(runtime, session, persistence, cmd)
        .and_then(|()| build_ui_state(session))
        .and_then(|state| Ok(serde_json::to_string(&state)?));
    match state {
        Ok(json) => json,
        Err(e) => {
            log::warn!("command failed: {e}");
            serde_json::json!({ "error": e.to_string() }).to_string()
        }
    }
}

fn handle_command(
    runtime: &Runtime,
    session: &mut PlanningSession,
    persistence: &dyn ScenarioPersistence,
    cmd: IpcCommand,
) -> Result<()> {
    match cmd {
        IpcCommand::GetState | IpcCommand::ListScenarios | IpcCommand::Quit => {}
        IpcCommand::SetCompanyRate { base_up, merit } => {
            session.set_company_rate(RateSplit::new(base_up, merit));
        }
        IpcCommand::SetLevelRate { level, base_up, merit } => {
            session.set_level_rate(level, RateSplit::new(base_up, merit));
        }
        IpcCommand::AdjustBand { band, base_up, merit } => {
            session.adjust_band(&band, RateSplit::new(base_up, merit));
        }
        IpcCommand::SetWeight { grade, weight } => {
            session.set_performance_weight(grade, weight);
        }
        IpcCommand::SetBudget { amount } => session.set_total_budget(amount),
        IpcCommand::SetBaseline { base_up, merit } => {
            runtime.block_on(session.apply_baseline_durable(Baseline::new(base_up, merit), persistence))?;
        }
        IpcCommand::SaveScenario { name } => {
            runtime.block_on(session.save_scenario_durable(&name, persistence))?;
        }
        IpcCommand::LoadScenario { id } => {
            runtime.block_on(session.load_scenario_durable(&id, persistence))?;
        }
        IpcCommand::RenameScenario { id, name } => {
            runtime.block_on(session.rename_scenario_durable(&id, &name, persistence))?;
        }
        IpcCommand::DeleteScenario { id } => {
            runtime.block_on(session.delete_scenario_durable(&id, persistence))?;
        }
    }
    Ok(())
}

fn build_ui_state(session: &mut PlanningSession) -> Result<UiState> {
    let scenarios = session
        .list_scenarios()
        .into_iter()
        .map(|s| ScenarioSummary {
            weighted_average_rate: s.data.weighted_average_rate,
            used_budget: s.data.used_budget,
            id: s.id,
            name: s.name,
        })
        .collect();

    Ok(UiState {
        revision:           session.revision(),
        active_scenario_id: session.active_scenario_id().to_string(),
        table:              session.table().clone(),
        aggregate:          session.aggregate()?,
        budget:             session.budget_report()?,
        competitiveness:    session.competitiveness()?,
        scenarios,
        events:             session.events().drain(),
    })
}

fn print_group(label: &str, g: &GroupAggregate) {
    println!(
        "  {label:<14} n={:<5} base-up {:>5.2}% | merit {:>5.2}% | rate {:>5.2}% | impact {:>14.0}",
        g.headcount, g.avg_base_up, g.avg_merit, g.avg_effective_rate, g.budget_impact
    );
}

fn print_summary(session: &PlanningSession) -> Result<()> {
    let aggregate = session.aggregate()?;
    let budget = session.budget_report()?;
    let report = session.competitiveness()?;

    println!("=== BY LEVEL ===");
    for (level, g) in &aggregate.levels {
        print_group(level.as_str(), g);
    }
    println!();
    println!("=== BY BAND ===");
    for (band, b) in &aggregate.bands {
        print_group(band, &b.totals);
    }
    println!();
    println!("=== COMPANY ===");
    print_group("all", &aggregate.company);
    println!();
    println!("=== BUDGET ===");
    println!("  raise cost:     {}", budget.raise_cost);
    println!("  promotion:      {}", budget.promotion_cost);
    println!("  additional:     {}", budget.additional_cost);
    println!("  used:           {}", budget.used_budget);
    println!("  ceiling:        {}", budget.ceiling);
    if budget.utilization.ceiling_defined {
        println!("  utilization:    {:.1}%", budget.utilization.percent());
    } else {
        println!("  utilization:    (no budget set)");
    }
    println!();
    println!("=== COMPETITIVENESS ({:?}) ===", report.statistic);
    match (report.company_as_is, report.company_to_be) {
        (Some(as_is), Some(to_be)) => println!("  company AS-IS {as_is:.1} → TO-BE {to_be:.1}"),
        _ => println!("  (no benchmark data)"),
    }
    for cell in &report.cells {
        if let (Some(as_is), Some(to_be)) = (cell.as_is, cell.to_be) {
            println!(
                "  {:<12} {} n={:<4} AS-IS {:>6.1} → TO-BE {:>6.1} ({:?})",
                cell.band, cell.level, cell.headcount, as_is, to_be, cell.to_be_class
            );
        }
    }
    println!();
    println!("=== SCENARIOS (active: {}) ===", session.active_scenario_id());
    for s in session.list_scenarios() {
        println!("  {:<38} {}", s.id, s.name);
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    flag_value(args, flag).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use comp_core::{employee::Employee, scenario::DEFAULT_SCENARIO_ID};

    fn employees() -> Vec<Employee> {
        vec![
            Employee::new("E1", Level::L1, "Sales", 30_000_000).with_grade(PerformanceGrade::B),
            Employee::new("E2", Level::L3, "Production", 65_000_000).with_grade(PerformanceGrade::A),
            Employee::new("E3", Level::L4, "Sales", 90_000_000).with_grade(PerformanceGrade::S),
        ]
    }

    fn replies(session: &mut PlanningSession, commands: &str) -> Vec<serde_json::Value> {
        let runtime = Runtime::new().unwrap();
        let persistence = MemoryPersistence::new();
        let mut output = Vec::new();
        run_ipc_loop(&runtime, session, &persistence, commands.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn unpriceable_state_is_reported_and_the_loop_continues() {
        let mut config = PlanConfig::default_test();
        config.levels = vec![Level::L1, Level::L2, Level::L3];
        let mut session = PlanningSession::new(config, employees());

        let out = replies(
            &mut session,
            "{\"type\":\"get_state\"}\n{\"type\":\"list_scenarios\"}\n{\"type\":\"quit\"}\n",
        );
        assert_eq!(out.len(), 2);
        for reply in &out {
            let error = reply["error"].as_str().unwrap();
            assert!(error.contains("L4"), "unexpected error: {error}");
        }
    }

    #[test]
    fn malformed_and_rejected_commands_do_not_end_the_loop() {
        let mut session = PlanningSession::new(PlanConfig::default_test(), employees());

        let out = replies(
            &mut session,
            "not json\n{\"type\":\"delete_scenario\",\"id\":\"default\"}\n{\"type\":\"get_state\"}\n",
        );
        assert_eq!(out.len(), 3);
        assert!(out[0]["error"].is_string());
        assert!(out[1]["error"].is_string());
        assert_eq!(out[2]["active_scenario_id"], DEFAULT_SCENARIO_ID);
    }

    #[test]
    fn storage_failure_at_startup_keeps_the_in_memory_session() {
        let runtime = Runtime::new().unwrap();
        let persistence = MemoryPersistence::new();
        persistence.set_failing(true);
        let mut session = PlanningSession::new(PlanConfig::default_test(), employees());

        restore_session(&runtime, &mut session, &persistence, Some(Baseline::new(4.0, 3.0)));

        assert_eq!(session.active_scenario_id(), DEFAULT_SCENARIO_ID);
        assert_eq!(session.table().company_rate(), RateSplit::new(4.0, 3.0));
        assert!(session
            .events()
            .history()
            .any(|e| matches!(e, PlanEvent::PersistenceFailed { .. })));
    }
}

//! planner-runner: headless runner for the territory planner.
//!
//! Usage:
//!   planner-runner --csv accounts.csv --data-dir ./data
//!   planner-runner --seed 7 --as-of 2025-01-01 --export report.csv
//!   planner-runner --ipc-mode

use anyhow::Result;
use chrono::NaiveDate;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use territory_core::{
    config::PlannerConfig,
    equity::InsightKind,
    model::{NewPendingAccount, PendingAccount, Segment},
    planner::{Analysis, ScenarioComparison, ScenarioState, TerritoryPlanner},
    projection::{GrowthScenario, ProjectionConfig, Projections},
    recommendation::AllocationRecommendation,
    types::format_money,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    AddRep {
        name: String,
        #[serde(default)]
        segment: Segment,
        #[serde(default)]
        territory: String,
    },
    RemoveRep {
        name: String,
    },
    Reassign {
        accounts: Vec<String>,
        to_rep: String,
    },
    Churn {
        rate: f64,
    },
    AddPending {
        account: NewPendingAccount,
    },
    ApplyPending,
    Reset,
    Projections {
        #[serde(default)]
        scenario: Option<GrowthScenario>,
        #[serde(default)]
        config: Option<ProjectionConfig>,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    state:                   ScenarioState,
    seed:                    u64,
    as_of:                   NaiveDate,
    capacity_runway:         String,
    changes:                 &'a [String],
    analysis:                &'a Analysis,
    pending:                 &'a [PendingAccount],
    pending_recommendations: Vec<AllocationRecommendation>,
    comparison:              ScenarioComparison,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let csv = flag_value(&args, "--csv");
    let export = flag_value(&args, "--export");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let as_of = match flag_value(&args, "--as-of") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid --as-of '{raw}': {e}"))?,
        None => chrono::Local::now().date_naive(),
    };

    if !ipc_mode {
        println!("Territory Planner: planner-runner");
        println!("  seed:      {seed}");
        println!("  as of:     {as_of}");
        println!("  accounts:  {}", csv.unwrap_or("(bundled sample)"));
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = if Path::new(data_dir).is_dir() {
        PlannerConfig::load(data_dir)?
    } else {
        log::warn!("Data directory {data_dir} not found, using built-in defaults");
        PlannerConfig::default()
    };

    let book = match csv {
        Some(path) => territory_core::ingest::load_csv_file(path)?,
        None => territory_core::ingest::sample_book()?,
    };
    let mut planner = TerritoryPlanner::new(book, config, seed, as_of)?;

    if ipc_mode {
        run_ipc_loop(&mut planner)?;
    } else {
        print_summary(&planner);
    }

    if let Some(path) = export {
        let csv = planner.export_report().to_csv()?;
        std::fs::write(path, csv).map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
        if !ipc_mode {
            println!();
            println!("Report written to {path}");
        }
    }

    Ok(())
}

fn run_ipc_loop(planner: &mut TerritoryPlanner) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(planner, cmd) {
            Ok(reply) => writeln!(stdout, "{reply}")?,
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

/// Apply one command and return the JSON reply line.
fn handle_command(planner: &mut TerritoryPlanner, cmd: IpcCommand) -> Result<String> {
    match cmd {
        IpcCommand::GetState | IpcCommand::Quit => {}
        IpcCommand::AddRep { name, segment, territory } => {
            planner.simulate_add_rep(&name, segment, &territory)?;
        }
        IpcCommand::RemoveRep { name } => planner.simulate_remove_rep(&name)?,
        IpcCommand::Reassign { accounts, to_rep } => planner.simulate_reassignment(accounts.as_slice(), &to_rep)?,
        IpcCommand::Churn { rate } => {
            planner.simulate_churn(rate)?;
        }
        IpcCommand::AddPending { account } => {
            planner.add_pending_account(account)?;
        }
        IpcCommand::ApplyPending => {
            planner.apply_pending()?;
        }
        IpcCommand::Reset => planner.reset_to_original()?,
        IpcCommand::Projections { scenario, config } => {
            let base = config.unwrap_or_else(|| planner.projection_config().clone());
            let levers = match scenario {
                Some(s) => base.for_scenario(s),
                None => base,
            };
            let projections: Projections = planner.calculate_projections(&levers)?;
            return Ok(serde_json::to_string(&projections)?);
        }
    }
    Ok(serde_json::to_string(&build_ui_state(planner))?)
}

fn build_ui_state(planner: &TerritoryPlanner) -> UiState<'_> {
    let analysis = planner.analysis();
    UiState {
        state: planner.state(),
        seed: planner.seed(),
        as_of: planner.as_of(),
        capacity_runway: analysis.projections.capacity_runway.to_string(),
        changes: planner.scenario_changes(),
        analysis,
        pending: planner.pending_accounts(),
        pending_recommendations: planner.pending_recommendations(),
        comparison: planner.scenario_comparison(),
    }
}

fn print_summary(planner: &TerritoryPlanner) {
    let analysis = planner.analysis();
    let s = &analysis.summary;

    println!("=== TEAM SUMMARY ===");
    println!("  reps:           {}", s.team_size);
    println!("  accounts:       {}", s.total_accounts);
    println!("  total ARR:      {}", format_money(s.total_arr));
    println!("  avg capacity:   {:.0}%", s.avg_capacity);
    println!("  whitespace:     {}", format_money(s.total_whitespace));
    println!("  at-risk ARR:    {} ({:.1}%)", format_money(s.total_at_risk_arr), s.at_risk_percent);
    println!("  avg health:     {:.0}", s.avg_health);

    println!();
    println!("=== REPS ===");
    for m in &analysis.metrics {
        println!(
            "  {:<20} {:<11} {:>3} accts | {:>7} | {:>4.0}% {:<13} | at-risk {}",
            m.rep_name,
            m.segment.label(),
            m.account_count,
            format_money(m.total_arr),
            m.capacity_score,
            m.capacity_status.as_str(),
            format_money(m.at_risk_arr)
        );
    }

    println!();
    println!("=== EQUITY (overall {:.0}) ===", analysis.equity.overall());
    for score in analysis.equity.all() {
        println!("  {:<11} {:>3.0}  {}", score.dimension.label(), score.score, score.explanation);
    }
    for insight in &analysis.insights {
        let tag = match insight.kind {
            InsightKind::Warning => "!",
            InsightKind::Info => "i",
            InsightKind::Success => "+",
        };
        println!("  [{tag}] {}", insight.message);
    }

    println!();
    println!("=== RECOMMENDATIONS ===");
    if analysis.recommendations.is_empty() {
        println!("  (None: the team is balanced)");
    }
    for rec in &analysis.recommendations {
        println!("  [{:?}] {}", rec.priority, rec.action);
        println!("         {}", rec.impact);
    }

    println!();
    println!("=== PROJECTION ({} months) ===", analysis.projections.config.projection_months);
    let p = &analysis.projections.projected;
    println!("  projected ARR:      {}", format_money(p.total_arr));
    println!("  projected capacity: {:.0}%", p.projected_capacity);
    println!("  required headcount: {} (hire {})", p.required_headcount, p.hiring_need);
    println!("  capacity runway:    {}", analysis.projections.capacity_runway);
    for event in &analysis.projections.timeline {
        println!("  {}  {:<28} {}", event.date, event.action, event.reason);
    }

    println!();
    println!(
        "=== BOOK HEALTH (team score {:.0}, {:?}) ===",
        analysis.health.avg_score, analysis.health.overall_status
    );
    for rep in &analysis.health.rep_scores {
        let notes: Vec<&str> = rep.issues.iter().chain(&rep.warnings).map(String::as_str).collect();
        println!("  {:<20} {:>3.0}  {}", rep.rep_name, rep.score, notes.join("; "));
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

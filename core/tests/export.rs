//! Scenario report export.

use chrono::NaiveDate;
use territory_core::{config::PlannerConfig, planner::TerritoryPlanner};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn planner() -> TerritoryPlanner {
    let _ = env_logger::builder().is_test(true).try_init();
    let as_of = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    TerritoryPlanner::sample(PlannerConfig::default(), 42, as_of).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The CSV carries a summary block and one row per rep under the details header.
#[test]
fn csv_has_summary_and_rep_rows() {
    let planner = planner();

    let csv = planner.export_report().to_csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "Territory Planner Report");
    assert!(lines.contains(&"Summary Metrics"));
    assert!(lines.iter().any(|l| l.starts_with("Team Size,8")), "Team size line missing:\n{csv}");
    let header = lines
        .iter()
        .position(|l| *l == "Rep,Segment,Accounts,ARR,Capacity,Status,Whitespace,At-Risk ARR,Avg Health")
        .expect("Details header missing");
    assert_eq!(lines.len() - header - 1, 8, "One row per rep");
    assert!(lines[header + 1].starts_with("Sarah Johnson,"));
}

/// Report rows follow the live scenario, not the baseline.
#[test]
fn export_tracks_scenario() {
    let mut planner = planner();
    planner.simulate_remove_rep("Mike Chen").unwrap();

    let report = planner.export_report();

    assert_eq!(report.rows.len(), 7);
    assert!(report.rows.iter().all(|r| r.rep != "Mike Chen"));
    assert_eq!(report.summary.team_size, 7);
    assert_eq!(report.rows.iter().map(|r| r.accounts).sum::<usize>(), 149);
}

//! Per-rep capacity metrics and the team summary.

use territory_core::{
    config::PlannerConfig,
    metrics::{calculate_capacity_metrics, rep_metrics, team_summary, CapacityStatus, TeamSummary},
    model::{Account, Book, Rep, Segment},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Mid-Market ideal of 300K, range 225K..375K.
fn config() -> PlannerConfig {
    PlannerConfig::default().with_arr_per_rep(Segment::MidMarket, 300_000.0)
}

fn rep(n: usize, name: &str) -> Rep {
    Rep {
        id:        format!("rep-{n}"),
        name:      name.to_string(),
        segment:   Segment::MidMarket,
        territory: "West".into(),
    }
}

fn account(n: usize, owner: usize, arr: f64, tam: f64, health: f64, churn: f64) -> Account {
    Account {
        id:              format!("acc-{n}"),
        name:            format!("Account {n}"),
        owner_id:        format!("rep-{owner}"),
        current_arr:     arr,
        internal_tam:    tam,
        health_score:    health,
        churn_risk:      churn,
        territory:       "West".into(),
        segment:         Segment::MidMarket,
        products_owned:  Vec::new(),
        lifecycle_stage: "Mature".into(),
    }
}

fn book_with_arr(arrs: &[f64]) -> Book {
    Book {
        reps: (1..=arrs.len()).map(|n| rep(n, &format!("Rep {n}"))).collect(),
        accounts: arrs
            .iter()
            .enumerate()
            .map(|(i, &arr)| account(i + 1, i + 1, arr, arr * 2.0, 80.0, 0.1))
            .collect(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Capacity is ARR over the segment's ideal ARR, and may exceed 100.
#[test]
fn capacity_score_is_arr_over_ideal() {
    let book = book_with_arr(&[150_000.0, 900_000.0]);

    let metrics = calculate_capacity_metrics(&book, &config());

    assert!((metrics[0].capacity_score - 50.0).abs() < 1e-9, "150K of 300K is 50%");
    assert!((metrics[1].capacity_score - 300.0).abs() < 1e-9, "900K of 300K is 300%");
}

/// Status bands: below 85 healthy, 85..=100 watch, above 100 over capacity.
#[test]
fn capacity_status_bands() {
    let book = book_with_arr(&[252_000.0, 270_000.0, 300_000.0, 303_000.0]);

    let statuses: Vec<CapacityStatus> = calculate_capacity_metrics(&book, &config())
        .iter()
        .map(|m| m.capacity_status)
        .collect();

    assert_eq!(
        statuses,
        vec![
            CapacityStatus::Healthy,
            CapacityStatus::Watch,
            CapacityStatus::Watch,
            CapacityStatus::OverCapacity,
        ]
    );
}

/// TAM below ARR contributes zero whitespace, never negative.
#[test]
fn whitespace_ignores_negative_gaps() {
    let book = Book {
        reps: vec![rep(1, "Avery")],
        accounts: vec![
            account(1, 1, 100_000.0, 50_000.0, 80.0, 0.1),
            account(2, 1, 100_000.0, 300_000.0, 80.0, 0.1),
        ],
    };

    let m = rep_metrics(&book, &book.reps[0], &config());

    assert_eq!(m.total_actionable_whitespace, 200_000.0);
}

/// At-risk ARR counts accounts strictly above the 0.25 cutoff.
#[test]
fn at_risk_cutoff_is_strict() {
    let book = Book {
        reps: vec![rep(1, "Avery")],
        accounts: vec![
            account(1, 1, 100_000.0, 200_000.0, 80.0, 0.25),
            account(2, 1, 40_000.0, 200_000.0, 60.0, 0.26),
        ],
    };

    let m = rep_metrics(&book, &book.reps[0], &config());

    assert_eq!(m.at_risk_arr, 40_000.0, "Only the 0.26 account is at risk");
    assert_eq!(m.avg_health, 70.0);
}

/// A rep with no accounts gets zero-valued metrics.
#[test]
fn empty_rep_yields_zero_metrics() {
    let book = Book { reps: vec![rep(1, "Avery")], accounts: Vec::new() };

    let m = rep_metrics(&book, &book.reps[0], &config());

    assert_eq!(m.account_count, 0);
    assert_eq!(m.total_arr, 0.0);
    assert_eq!(m.capacity_score, 0.0);
    assert_eq!(m.avg_health, 0.0);
    assert_eq!(m.benchmark_comparison.arr_diff, 0.0);
    assert_eq!(m.capacity_status, CapacityStatus::Healthy);
}

/// Benchmark diffs are signed percentages from the range midpoint.
#[test]
fn benchmark_diff_against_midpoint() {
    let book = book_with_arr(&[450_000.0]);

    let m = &calculate_capacity_metrics(&book, &config())[0];

    assert!((m.benchmark_comparison.arr_diff - 50.0).abs() < 1e-9, "450K vs 300K midpoint is +50%");
    // One account against the 25..40 Mid-Market range (midpoint 32.5).
    let expected = (1.0 / 32.5 - 1.0) * 100.0;
    assert!((m.benchmark_comparison.accounts_diff - expected).abs() < 1e-9);
}

/// Team summary rolls up totals and averages.
#[test]
fn team_summary_rolls_up() {
    let book = book_with_arr(&[150_000.0, 450_000.0]);
    let metrics = calculate_capacity_metrics(&book, &config());

    let s = team_summary(&metrics);

    assert_eq!(s.team_size, 2);
    assert_eq!(s.total_arr, 600_000.0);
    assert_eq!(s.total_accounts, 2);
    assert_eq!(s.total_whitespace, 600_000.0);
    assert!((s.avg_capacity - 100.0).abs() < 1e-9);
    assert_eq!(s.avg_arr_per_rep, 300_000.0);
}

/// An empty team summarizes to zeros.
#[test]
fn empty_team_summary_is_zero() {
    assert_eq!(team_summary(&[]), TeamSummary::default());
}

//! Equity scoring and insights.

use chrono::NaiveDate;
use territory_core::{
    config::PlannerConfig,
    equity::{calculate_equity_scores, equity_insights, EquityStatus, InsightKind},
    metrics::{calculate_capacity_metrics, team_summary},
    model::{Account, Book, Rep, Segment},
    planner::TerritoryPlanner,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn config() -> PlannerConfig {
    PlannerConfig::default().with_arr_per_rep(Segment::MidMarket, 300_000.0)
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

fn account(n: usize, owner: usize, arr: f64, churn: f64) -> Account {
    Account {
        id:              format!("acc-{n}"),
        name:            format!("Account {n}"),
        owner_id:        format!("rep-{owner}"),
        current_arr:     arr,
        internal_tam:    arr * 2.0,
        health_score:    80.0,
        churn_risk:      churn,
        territory:       "West".into(),
        segment:         Segment::MidMarket,
        products_owned:  Vec::new(),
        lifecycle_stage: "Mature".into(),
    }
}

/// One account per rep, with the given ARR and churn risk.
fn team(reps: &[(&str, f64, f64)]) -> Book {
    Book {
        reps: reps
            .iter()
            .enumerate()
            .map(|(i, (name, _, _))| Rep {
                id:        format!("rep-{}", i + 1),
                name:      name.to_string(),
                segment:   Segment::MidMarket,
                territory: "West".into(),
            })
            .collect(),
        accounts: reps
            .iter()
            .enumerate()
            .map(|(i, (_, arr, churn))| account(i + 1, i + 1, *arr, *churn))
            .collect(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// 900K / 150K / 150K against a 300K benchmark is a critically unfair split.
#[test]
fn overloaded_rep_scores_low_capacity_equity() {
    let book = team(&[("Avery", 900_000.0, 0.1), ("Blake", 150_000.0, 0.1), ("Casey", 150_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());

    let scores = calculate_equity_scores(&metrics, &config().thresholds);

    assert!(scores.capacity.score < 50.0, "Capacity equity should be low, got {}", scores.capacity.score);
    assert_eq!(scores.capacity.status, EquityStatus::Critical);
    assert_eq!(
        scores.capacity.imbalance_contributors,
        vec!["rep-1".to_string()],
        "Only the overloaded rep sits beyond one sigma"
    );
}

/// A single rep is trivially balanced on every dimension.
#[test]
fn single_rep_scores_perfect() {
    let book = team(&[("Avery", 500_000.0, 0.4)]);
    let metrics = calculate_capacity_metrics(&book, &config());

    let scores = calculate_equity_scores(&metrics, &config().thresholds);

    for score in scores.all() {
        assert_eq!(score.score, 100.0, "{:?} should be 100 for one rep", score.dimension);
        assert!(score.imbalance_contributors.is_empty());
    }
}

/// All-zero values (no at-risk ARR anywhere) score 100, not NaN.
#[test]
fn all_zero_dimension_scores_perfect() {
    let book = team(&[("Avery", 100_000.0, 0.1), ("Blake", 300_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());

    let scores = calculate_equity_scores(&metrics, &config().thresholds);

    assert_eq!(scores.risk.score, 100.0);
    assert_eq!(scores.risk.status, EquityStatus::Good);
}

/// Identical reps are perfectly balanced with no contributors.
#[test]
fn identical_reps_have_no_contributors() {
    let book = team(&[("Avery", 200_000.0, 0.1), ("Blake", 200_000.0, 0.1), ("Casey", 200_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());

    let scores = calculate_equity_scores(&metrics, &config().thresholds);

    assert_eq!(scores.arr.score, 100.0);
    assert!(scores.arr.imbalance_contributors.is_empty());
}

/// Every score on the sample book stays within [0, 100].
#[test]
fn sample_scores_are_bounded() {
    let planner = TerritoryPlanner::sample(PlannerConfig::default(), 42, as_of()).unwrap();

    for score in planner.calculate_equity_scores().all() {
        assert!(
            (0.0..=100.0).contains(&score.score),
            "{:?} score {} out of range",
            score.dimension,
            score.score
        );
    }
}

/// Over-capacity and ARR-ratio warnings name the reps involved.
#[test]
fn insights_flag_overload_and_ratio() {
    let book = team(&[("Avery", 900_000.0, 0.1), ("Blake", 150_000.0, 0.1), ("Casey", 150_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());
    let summary = team_summary(&metrics);

    let insights = equity_insights(&metrics, &summary, &config().thresholds);

    assert!(
        insights
            .iter()
            .any(|i| i.kind == InsightKind::Warning && i.message.contains("Avery manages 6.0x more ARR than Blake")),
        "Expected an ARR ratio warning, got {insights:?}"
    );
    assert!(
        insights.iter().any(|i| i.message.contains("over capacity: Avery")),
        "Expected an over-capacity warning naming Avery"
    );
    assert!(insights.iter().all(|i| i.kind != InsightKind::Success));
}

/// At-risk concentration lists the largest at-risk holder first.
#[test]
fn insights_rank_risk_holders() {
    let book = team(&[("Avery", 100_000.0, 0.5), ("Blake", 200_000.0, 0.5), ("Casey", 200_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());
    let summary = team_summary(&metrics);

    let insights = equity_insights(&metrics, &summary, &config().thresholds);

    assert!(
        insights.iter().any(|i| i.message.contains(">20% at-risk ARR: Blake, Avery")),
        "Expected Blake before Avery, got {insights:?}"
    );
}

/// A team entirely within 60–85% capacity earns a success insight.
#[test]
fn balanced_team_earns_success() {
    let book = team(&[("Avery", 210_000.0, 0.1), ("Blake", 220_000.0, 0.1)]);
    let metrics = calculate_capacity_metrics(&book, &config());
    let summary = team_summary(&metrics);

    let insights = equity_insights(&metrics, &summary, &config().thresholds);

    assert!(insights.iter().any(|i| i.kind == InsightKind::Success));
}

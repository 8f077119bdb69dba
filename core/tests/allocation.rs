//! Pending accounts: queueing, routing and commit.

use chrono::NaiveDate;
use territory_core::{
    config::PlannerConfig,
    error::PlannerError,
    model::{Account, Book, NewPendingAccount, Rep, Segment},
    planner::{ScenarioState, TerritoryPlanner},
    recommendation::Fit,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn config() -> PlannerConfig {
    PlannerConfig::default().with_arr_per_rep(Segment::MidMarket, 300_000.0)
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

/// One rep per entry: (name, territory, ARR held in a single account).
fn planner_with(reps: &[(&str, &str, f64)]) -> TerritoryPlanner {
    let book = Book {
        reps: reps
            .iter()
            .enumerate()
            .map(|(i, (name, territory, _))| Rep {
                id:        format!("rep-{}", i + 1),
                name:      name.to_string(),
                segment:   Segment::MidMarket,
                territory: territory.to_string(),
            })
            .collect(),
        accounts: reps
            .iter()
            .enumerate()
            .map(|(i, (_, territory, arr))| Account {
                id:              format!("acc-{}", i + 1),
                name:            format!("Account {}", i + 1),
                owner_id:        format!("rep-{}", i + 1),
                current_arr:     *arr,
                internal_tam:    arr * 2.0,
                health_score:    85.0,
                churn_risk:      0.1,
                territory:       territory.to_string(),
                segment:         Segment::MidMarket,
                products_owned:  Vec::new(),
                lifecycle_stage: "Mature".into(),
            })
            .collect(),
    };
    TerritoryPlanner::new(book, config(), 42, as_of()).unwrap()
}

fn pending(name: &str, arr: f64) -> NewPendingAccount {
    NewPendingAccount {
        name:      name.to_string(),
        arr,
        tam:       None,
        territory: None,
        segment:   Segment::MidMarket,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A 50K account goes to the rep at 40% ahead of the rep at 95%, as an excellent fit.
#[test]
fn least_loaded_rep_ranks_first() {
    let mut planner = planner_with(&[("Busy", "West", 285_000.0), ("Free", "West", 120_000.0)]);
    planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();

    let recs = planner.pending_recommendations();

    let top = recs[0].top().unwrap();
    assert_eq!(top.rep_name, "Free", "The 40% rep must rank first");
    assert_eq!(top.fit, Fit::Excellent);
    assert!((top.current_capacity - 40.0).abs() < 1e-9);
    assert_eq!(recs[0].candidates[1].rep_name, "Busy");
    assert_eq!(recs[0].candidates[1].fit, Fit::Fair);
}

/// Earlier accounts in a batch count against the rep they land on.
#[test]
fn batch_routing_is_greedy() {
    let mut planner = planner_with(&[("Avery", "West", 120_000.0), ("Blake", "West", 135_000.0)]);
    planner.add_pending_account(pending("First", 100_000.0)).unwrap();
    planner.add_pending_account(pending("Second", 100_000.0)).unwrap();

    let recs = planner.pending_recommendations();

    assert_eq!(recs[0].top().unwrap().rep_name, "Avery");
    assert_eq!(
        recs[1].top().unwrap().rep_name,
        "Blake",
        "Avery already absorbed the first account"
    );
}

/// Equal load breaks ties on territory.
#[test]
fn territory_breaks_ties() {
    let mut planner = planner_with(&[("Avery", "West", 150_000.0), ("Blake", "East", 150_000.0)]);
    planner
        .add_pending_account(NewPendingAccount { territory: Some("East".into()), ..pending("Eastco", 10_000.0) })
        .unwrap();

    let recs = planner.pending_recommendations();

    let top = recs[0].top().unwrap();
    assert_eq!(top.rep_name, "Blake");
    assert!(top.reasons.iter().any(|r| r == "Territory match"));
}

/// At most three candidates per account.
#[test]
fn candidates_are_capped() {
    let mut planner = planner_with(&[
        ("A", "West", 100_000.0),
        ("B", "West", 110_000.0),
        ("C", "West", 120_000.0),
        ("D", "West", 130_000.0),
    ]);
    planner.add_pending_account(pending("Newco", 10_000.0)).unwrap();

    assert_eq!(planner.pending_recommendations()[0].candidates.len(), 3);
}

/// Applying commits new accounts with onboarding defaults and empties the queue.
#[test]
fn apply_pending_commits_accounts() {
    let mut planner = planner_with(&[("Busy", "West", 285_000.0), ("Free", "West", 120_000.0)]);
    let before_arr = planner.team_summary().total_arr;
    planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();

    let created = planner.apply_pending().unwrap();

    assert_eq!(created.len(), 1);
    assert!(planner.pending_accounts().is_empty(), "Queue must be cleared");
    let account = planner.scenario().accounts.iter().find(|a| a.id == created[0]).unwrap();
    assert_eq!(account.owner_id, "rep-2");
    assert_eq!(account.health_score, 80.0);
    assert_eq!(account.churn_risk, 0.05);
    assert_eq!(account.lifecycle_stage, "Onboarding");
    assert_eq!(account.internal_tam, 150_000.0, "TAM defaults to three times ARR");
    assert_eq!(planner.team_summary().total_arr, before_arr + 50_000.0);
    assert_eq!(planner.state(), ScenarioState::Modified);
    assert_eq!(planner.original().accounts.len(), 2, "Baseline is untouched");
}

/// An unknown pending id rejects the whole batch.
#[test]
fn unknown_pending_id_rejects_batch() {
    let mut planner = planner_with(&[("Avery", "West", 120_000.0)]);
    planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();
    let mut recs = planner.pending_recommendations();
    recs.push(recs[0].clone());
    recs[1].pending_id = "missing".into();

    let result = planner.apply_recommendations(&recs);

    assert!(matches!(result, Err(PlannerError::PendingNotFound { .. })));
    assert_eq!(planner.scenario().accounts.len(), 1, "Nothing may be committed");
    assert_eq!(planner.pending_accounts().len(), 1, "Queue is untouched");
}

/// Blank names and negative ARR are refused at the door.
#[test]
fn invalid_pending_accounts_are_rejected() {
    let mut planner = planner_with(&[("Avery", "West", 120_000.0)]);

    assert!(matches!(
        planner.add_pending_account(pending("   ", 50_000.0)),
        Err(PlannerError::InvalidPendingAccount { .. })
    ));
    assert!(matches!(
        planner.add_pending_account(pending("Newco", -1.0)),
        Err(PlannerError::InvalidPendingAccount { .. })
    ));
    assert!(planner.pending_accounts().is_empty());
}

/// Removing a queued account by id.
#[test]
fn pending_account_can_be_removed() {
    let mut planner = planner_with(&[("Avery", "West", 120_000.0)]);
    let id = planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();

    let removed = planner.remove_pending_account(&id).unwrap();

    assert_eq!(removed.name, "Newco");
    assert!(planner.pending_accounts().is_empty());
    assert!(matches!(planner.remove_pending_account(&id), Err(PlannerError::PendingNotFound { .. })));
}

/// Fit is graded on the load the rep carries today, not on the load after the account lands.
#[test]
fn fit_follows_current_capacity() {
    let mut planner = planner_with(&[("Avery", "West", 195_000.0)]);
    planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();

    let recs = planner.pending_recommendations();

    let top = recs[0].top().unwrap();
    assert!((top.current_capacity - 65.0).abs() < 1e-9);
    assert!((top.projected_capacity - 245_000.0 / 3_000.0).abs() < 1e-9, "Projected {}", top.projected_capacity);
    assert_eq!(top.fit, Fit::Excellent, "65% today is an excellent fit even though it lands above 70%");
    assert_eq!(top.reasons[0], "Capacity 65% -> 82% after assignment");
}

/// Reps in different segments are ranked by today's load, even when the
/// bigger ideal would absorb the account with a smaller jump.
#[test]
fn ranking_uses_current_capacity_across_segments() {
    let rep = |id: &str, name: &str, segment: Segment| Rep {
        id:        id.into(),
        name:      name.into(),
        segment,
        territory: "West".into(),
    };
    let account = |id: &str, owner: &str, arr: f64, segment: Segment| Account {
        id:              id.into(),
        name:            format!("Account {id}"),
        owner_id:        owner.into(),
        current_arr:     arr,
        internal_tam:    arr * 2.0,
        health_score:    85.0,
        churn_risk:      0.1,
        territory:       "West".into(),
        segment,
        products_owned:  Vec::new(),
        lifecycle_stage: "Mature".into(),
    };
    // SMB ideal 1.5M, Enterprise ideal 7M.
    let book = Book {
        reps: vec![rep("rep-1", "Sam", Segment::Smb), rep("rep-2", "Eli", Segment::Enterprise)],
        accounts: vec![
            account("acc-1", "rep-1", 900_000.0, Segment::Smb),
            account("acc-2", "rep-2", 4_340_000.0, Segment::Enterprise),
        ],
    };
    let mut planner = TerritoryPlanner::new(book, PlannerConfig::default(), 42, as_of()).unwrap();
    planner.add_pending_account(pending("Newco", 500_000.0)).unwrap();

    let recs = planner.pending_recommendations();

    let top = recs[0].top().unwrap();
    assert_eq!(top.rep_name, "Sam", "60% today ranks ahead of 62% today");
    assert_eq!(top.fit, Fit::Excellent);
    assert!(
        top.projected_capacity > recs[0].candidates[1].projected_capacity,
        "Sam lands higher after assignment and still ranks first"
    );
}

/// A pending id listed twice rejects the batch before anything is committed.
#[test]
fn duplicate_pending_id_rejects_batch() {
    let mut planner = planner_with(&[("Avery", "West", 120_000.0)]);
    planner.add_pending_account(pending("Newco", 50_000.0)).unwrap();
    let mut recs = planner.pending_recommendations();
    recs.push(recs[0].clone());

    let result = planner.apply_recommendations(&recs);

    assert!(matches!(result, Err(PlannerError::InvalidRequest { .. })), "Got {result:?}");
    assert_eq!(planner.scenario().accounts.len(), 1, "Nothing may be committed");
    assert_eq!(planner.pending_accounts().len(), 1, "Queue is untouched");
    assert_eq!(planner.state(), ScenarioState::Clean);
    assert!(planner.scenario_changes().is_empty());
}

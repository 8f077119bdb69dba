//! CSV ingestion: column checks, field validation, rep derivation.

use territory_core::{
    error::PlannerError,
    ingest::{parse_csv, sample_book},
    model::Segment,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const HEADER: &str = "account_name,owner,current_arr,internal_tam,health_score,churn_risk,territory,segment,products_owned,lifecycle_stage";

fn csv_with_rows(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The bundled sample book has eight reps and their 149 accounts.
#[test]
fn sample_book_loads() {
    let book = sample_book().unwrap();

    assert_eq!(book.reps.len(), 8, "Expected 8 reps in the sample");
    assert_eq!(book.accounts.len(), 149, "Expected 149 sample accounts");
    assert_eq!(book.reps[0].name, "Sarah Johnson");
    assert_eq!(book.reps[0].id, "rep-1");

    let mike = book.rep_by_name("Mike Chen").unwrap();
    assert_eq!(book.accounts_of(&mike.id).count(), 30, "Mike Chen owns 30 accounts");
}

/// Quoted product lists split into individual products.
#[test]
fn products_owned_splits_quoted_list() {
    let book = sample_book().unwrap();
    let acme = book.account_by_name("Acme Corporation").unwrap();

    assert_eq!(acme.products_owned, vec!["Core Platform".to_string(), "Analytics".to_string()]);
    assert_eq!(acme.segment, Segment::MidMarket);
    assert_eq!(acme.territory, "West Coast");
}

/// Every missing required column is reported, not just the first.
#[test]
fn missing_columns_are_all_listed() {
    let csv = "account_name,owner,current_arr\nAcme,Sam,1000\n";

    let err = parse_csv(csv.as_bytes()).unwrap_err();

    match err {
        PlannerError::MissingColumns { columns } => {
            assert_eq!(columns, vec!["internal_tam", "health_score", "churn_risk"]);
        }
        other => panic!("Expected MissingColumns, got {other:?}"),
    }
}

/// A non-numeric value fails the load with its data row number.
#[test]
fn non_numeric_field_reports_row() {
    let csv = csv_with_rows(&[
        "Acme,Sam,1000,2000,80,0.1,West,SMB,Core,Mature",
        "Beta,Sam,1000,2000,abc,0.1,West,SMB,Core,Mature",
    ]);

    let err = parse_csv(csv.as_bytes()).unwrap_err();

    match &err {
        PlannerError::InvalidField { row, column, value, .. } => {
            assert_eq!(*row, 2, "Second data row is the bad one");
            assert_eq!(column, "health_score");
            assert_eq!(value, "abc");
        }
        other => panic!("Expected InvalidField, got {other:?}"),
    }
    assert!(err.to_string().contains("Row 2"), "Message should name the row: {err}");
}

/// Out-of-range churn risk is rejected, not clamped.
#[test]
fn churn_risk_out_of_range_is_rejected() {
    let csv = csv_with_rows(&["Acme,Sam,1000,2000,80,1.5,West,SMB,Core,Mature"]);

    let err = parse_csv(csv.as_bytes()).unwrap_err();

    assert!(
        matches!(err, PlannerError::InvalidField { ref column, .. } if column == "churn_risk"),
        "Expected churn_risk InvalidField, got {err:?}"
    );
}

/// Negative ARR is rejected.
#[test]
fn negative_arr_is_rejected() {
    let csv = csv_with_rows(&["Acme,Sam,-5,2000,80,0.1,West,SMB,Core,Mature"]);

    assert!(matches!(
        parse_csv(csv.as_bytes()),
        Err(PlannerError::InvalidField { ref column, .. }) if column == "current_arr"
    ));
}

/// A blank owner is invalid.
#[test]
fn empty_owner_is_rejected() {
    let csv = csv_with_rows(&["Acme,,1000,2000,80,0.1,West,SMB,Core,Mature"]);

    assert!(matches!(
        parse_csv(csv.as_bytes()),
        Err(PlannerError::InvalidField { ref column, .. }) if column == "owner"
    ));
}

/// Header only, or nothing at all, is an empty dataset.
#[test]
fn empty_input_is_empty_dataset() {
    let header_only = format!("{HEADER}\n");

    assert!(matches!(parse_csv(header_only.as_bytes()), Err(PlannerError::EmptyDataset)));
    assert!(matches!(parse_csv("".as_bytes()), Err(PlannerError::EmptyDataset)));
}

/// Headers match regardless of case, padding and quotes.
#[test]
fn headers_are_normalized() {
    let csv = " Account_Name ,OWNER,\"Current_ARR\",internal_tam,Health_Score,churn_risk\nAcme,Sam,1000,2000,80,0.1\n";

    let book = parse_csv(csv.as_bytes()).unwrap();

    assert_eq!(book.accounts.len(), 1);
    assert_eq!(book.accounts[0].current_arr, 1000.0);
}

/// Optional columns fall back to documented defaults.
#[test]
fn optional_columns_default() {
    let csv = "account_name,owner,current_arr,internal_tam,health_score,churn_risk\nAcme,Sam,1000,2000,80,0.1\n";

    let book = parse_csv(csv.as_bytes()).unwrap();
    let account = &book.accounts[0];

    assert_eq!(account.territory, "Unassigned");
    assert_eq!(account.segment, Segment::MidMarket);
    assert_eq!(account.lifecycle_stage, "Adopting");
    assert!(account.products_owned.is_empty());
}

/// A rep takes the most common segment and territory of their accounts.
#[test]
fn rep_segment_is_most_common() {
    let csv = csv_with_rows(&[
        "A1,Sam,1000,2000,80,0.1,East,SMB,Core,Mature",
        "A2,Sam,1000,2000,80,0.1,West,Enterprise,Core,Mature",
        "A3,Sam,1000,2000,80,0.1,West,Enterprise,Core,Mature",
        "B1,Kit,1000,2000,80,0.1,North,Mid-Market,Core,Mature",
    ]);

    let book = parse_csv(csv.as_bytes()).unwrap();

    let sam = book.rep_by_name("Sam").unwrap();
    assert_eq!(sam.segment, Segment::Enterprise);
    assert_eq!(sam.territory, "West");
    assert_eq!(book.reps[1].name, "Kit", "Reps keep first-appearance order");
    assert_eq!(book.accounts[3].owner_id, "rep-2");
}

/// Unknown segment spellings are rejected rather than guessed.
#[test]
fn unknown_segment_is_rejected() {
    let csv = csv_with_rows(&["Acme,Sam,1000,2000,80,0.1,West,Galactic,Core,Mature"]);

    assert!(matches!(
        parse_csv(csv.as_bytes()),
        Err(PlannerError::InvalidField { ref column, .. }) if column == "segment"
    ));
}

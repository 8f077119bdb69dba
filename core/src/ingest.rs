//! CSV ingestion: turns a CRM export into a `Book`.
//!
//! RULES:
//!   - Headers are matched case-insensitively after trimming quotes and spaces.
//!   - A bad numeric field fails the whole load with its row number.
//!     Values are never silently defaulted.
//!   - Reps are created from distinct owners in first-appearance order.

use crate::{
    error::{PlannerError, PlannerResult},
    model::{Account, Book, Rep, Segment},
};
use std::{collections::HashMap, fs::File, io::Read, path::Path};

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "account_name",
    "owner",
    "current_arr",
    "internal_tam",
    "health_score",
    "churn_risk",
];

const DEFAULT_TERRITORY: &str = "Unassigned";
const DEFAULT_LIFECYCLE: &str = "Adopting";

const SAMPLE_CSV: &str = include_str!("../../data/sample/sample_accounts.csv");

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_ascii_lowercase()
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn invalid(row: usize, column: &str, value: &str, reason: &str) -> PlannerError {
    PlannerError::InvalidField {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn required_text(cols: &Columns, record: &csv::StringRecord, row: usize, column: &str) -> PlannerResult<String> {
    cols.get(record, column)
        .map(str::to_string)
        .ok_or_else(|| invalid(row, column, "", "value is required"))
}

fn number_in(
    cols:   &Columns,
    record: &csv::StringRecord,
    row:    usize,
    column: &str,
    min:    f64,
    max:    f64,
) -> PlannerResult<f64> {
    let raw = cols
        .get(record, column)
        .ok_or_else(|| invalid(row, column, "", "value is required"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid(row, column, raw, "not a number"))?;
    if !value.is_finite() {
        return Err(invalid(row, column, raw, "must be finite"));
    }
    if value < min || value > max {
        let reason = if max.is_finite() {
            format!("must be between {min} and {max}")
        } else {
            format!("must be at least {min}")
        };
        return Err(invalid(row, column, raw, &reason));
    }
    Ok(value)
}

/// Most frequent value, earliest first appearance on ties.
fn mode<T: PartialEq + Clone>(values: &[T]) -> Option<T> {
    let mut best: Option<(&T, usize)> = None;
    for v in values {
        let count = values.iter().filter(|x| *x == v).count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

/// Parse a CSV export into a book. Rep segment and territory are the
/// most common values among each rep's accounts.
pub fn parse_csv<R: Read>(reader: R) -> PlannerResult<Book> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PlannerError::EmptyDataset);
    }
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_header(h), i))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PlannerError::MissingColumns { columns: missing });
    }
    let cols = Columns { index };

    let mut owners: Vec<String> = Vec::new();
    let mut owner_index: HashMap<String, usize> = HashMap::new();
    let mut owner_segments: Vec<Vec<Segment>> = Vec::new();
    let mut owner_territories: Vec<Vec<String>> = Vec::new();
    let mut accounts: Vec<Account> = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let name = required_text(&cols, &record, row, "account_name")?;
        let owner = required_text(&cols, &record, row, "owner")?;
        let current_arr = number_in(&cols, &record, row, "current_arr", 0.0, f64::INFINITY)?;
        let internal_tam = number_in(&cols, &record, row, "internal_tam", 0.0, f64::INFINITY)?;
        let health_score = number_in(&cols, &record, row, "health_score", 0.0, 100.0)?;
        let churn_risk = number_in(&cols, &record, row, "churn_risk", 0.0, 1.0)?;

        let segment = match cols.get(&record, "segment") {
            Some(raw) => Segment::parse(raw)
                .ok_or_else(|| invalid(row, "segment", raw, "expected SMB, Mid-Market or Enterprise"))?,
            None => Segment::default(),
        };
        let territory = cols
            .get(&record, "territory")
            .unwrap_or(DEFAULT_TERRITORY)
            .to_string();
        let products_owned: Vec<String> = cols
            .get(&record, "products_owned")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let lifecycle_stage = cols
            .get(&record, "lifecycle_stage")
            .unwrap_or(DEFAULT_LIFECYCLE)
            .to_string();

        let slot = match owner_index.get(&owner) {
            Some(&slot) => slot,
            None => {
                owners.push(owner.clone());
                owner_segments.push(Vec::new());
                owner_territories.push(Vec::new());
                owner_index.insert(owner.clone(), owners.len() - 1);
                owners.len() - 1
            }
        };
        owner_segments[slot].push(segment);
        owner_territories[slot].push(territory.clone());

        accounts.push(Account {
            id: format!("acc-{}", accounts.len() + 1),
            name,
            owner_id: format!("rep-{}", slot + 1),
            current_arr,
            internal_tam,
            health_score,
            churn_risk,
            territory,
            segment,
            products_owned,
            lifecycle_stage,
        });
    }

    if accounts.is_empty() {
        return Err(PlannerError::EmptyDataset);
    }

    let reps: Vec<Rep> = owners
        .into_iter()
        .enumerate()
        .map(|(slot, name)| Rep {
            id: format!("rep-{}", slot + 1),
            name,
            segment: mode(&owner_segments[slot]).unwrap_or_default(),
            territory: mode(&owner_territories[slot]).unwrap_or_else(|| DEFAULT_TERRITORY.to_string()),
        })
        .collect();

    log::info!("Loaded {} accounts across {} reps", accounts.len(), reps.len());
    Ok(Book { reps, accounts })
}

pub fn load_csv_file(path: impl AsRef<Path>) -> PlannerResult<Book> {
    let path = path.as_ref();
    let file = File::open(path)?;
    log::info!("Reading accounts from {}", path.display());
    parse_csv(file)
}

/// The bundled demo book of eight reps.
pub fn sample_book() -> PlannerResult<Book> {
    parse_csv(SAMPLE_CSV.as_bytes())
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Row {row}: invalid {column} '{value}': {reason}")]
    InvalidField {
        row:    usize,
        column: String,
        value:  String,
        reason: String,
    },

    #[error("CSV must contain a header row and at least one data row")]
    EmptyDataset,

    #[error("Rep '{name}' not found")]
    RepNotFound { name: String },

    #[error("Account '{name}' not found")]
    AccountNotFound { name: String },

    #[error("Rep '{name}' already exists")]
    DuplicateRep { name: String },

    #[error("Cannot remove '{name}': the team must keep at least one rep")]
    LastRep { name: String },

    #[error("No reps available to take accounts")]
    NoReps,

    #[error("Invalid {name}: {value} ({reason})")]
    InvalidParameter {
        name:   String,
        value:  f64,
        reason: String,
    },

    #[error("Pending account '{id}' not found")]
    PendingNotFound { id: String },

    #[error("Invalid pending account: {reason}")]
    InvalidPendingAccount { reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlannerError {
    pub(crate) fn invalid_parameter(name: &str, value: f64, reason: &str) -> Self {
        Self::InvalidParameter {
            name:   name.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

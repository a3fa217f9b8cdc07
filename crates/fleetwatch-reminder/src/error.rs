use thiserror::Error;

/// Errors that can occur within the reminder subsystem.
///
/// Everything here is fatal for the pass. Per-event problems (a malformed
/// date, one failed send) are counted in
/// [`PassSummary`](crate::types::PassSummary) instead.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The fleet sheet lacks columns the run cannot do without.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Local fleet file not found: {0} (set fleet.source_url / GSHEET_CSV_URL or add the file)")]
    SourceNotFound(String),

    /// Downloading the published sheet failed (transport, timeout or HTTP status).
    #[error("Fleet download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying SQLite / rusqlite error from the ledger.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A threshold below zero; overdue days always fire, so it can never match.
    #[error("Invalid threshold: {0} (must be >= 0)")]
    InvalidThreshold(i64),
}

pub type Result<T> = std::result::Result<T, ReminderError>;

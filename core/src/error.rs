use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {reason}")]
    Config { reason: String },

    #[error("Date {anchor} minus {days} days is out of range")]
    DateOutOfRange { anchor: NaiveDate, days: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PulseResult<T> = Result<T, PulseError>;

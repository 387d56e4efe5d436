use thiserror::Error;

/// Errors raised by the tracker library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Template name must be unique: '{0}' already exists")]
    TemplateNameNotUnique(String),
    #[error("Workout entry not found: ID {0}")]
    EntryNotFound(i64),
    #[error("Set {set_number} not found for workout entry {entry_id}")]
    SetNotFound { entry_id: i64, set_number: u32 },
    #[error("No set is running")]
    NoRunningSet,
    #[error("Invalid value: {0}")]
    Invalid(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

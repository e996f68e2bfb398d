//! Failure taxonomy of the CSV aggregation pipeline.

use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Every way a job can fail. The `Display` text is the human-readable message
/// sent to listeners and kept by the result backend.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("CSV must include '{column}' column.")]
    MissingColumn { column: String },

    #[error("CSV not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Invalid CSV: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl JobError {
    pub fn code(&self) -> &'static str {
        match self {
            JobError::MissingColumn { .. } => "MISSING_COLUMN",
            JobError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            JobError::Validation(_) => "VALIDATION_ERROR",
            JobError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Payload attached to the `FAILURE` notification.
    pub fn failure_payload(&self) -> Value {
        json!({ "error": self.to_string(), "kind": self.code() })
    }
}

impl From<csv::Error> for JobError {
    fn from(err: csv::Error) -> Self {
        JobError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Validation(err.to_string())
    }
}

impl From<rusqlite::Error> for JobError {
    fn from(err: rusqlite::Error) -> Self {
        JobError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_message_names_the_column() {
        let err = JobError::MissingColumn {
            column: "stock_code".to_string(),
        };
        assert_eq!(err.to_string(), "CSV must include 'stock_code' column.");
        assert_eq!(
            err.failure_payload(),
            json!({"error": "CSV must include 'stock_code' column.", "kind": "MISSING_COLUMN"})
        );
    }

    #[test]
    fn sqlite_errors_map_to_store_unavailable() {
        let err: JobError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }
}

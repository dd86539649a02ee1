//! Unified error hierarchy for athlab
//!
//! Core computations (normalizer, aggregator) raise narrow error types; the
//! persistence, runner and export layers wrap theirs into [`AthlabError`] so the
//! CLI boundary can map any failure to a severity and an HTTP-equivalent status.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all athlab operations
#[derive(Debug, Error)]
pub enum AthlabError {
    /// Caller supplied a bad or missing required field
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// Analytics contract violations (e.g. unordered records)
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// External protocol script errors
    #[error("Protocol runner error: {0}")]
    Runner(#[from] RunnerError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A required numeric field was missing, malformed, non-finite or out of range.
///
/// This is the only validation the normalizer performs; schema-level checks
/// belong to whoever builds the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input for '{field}': {reason}")]
pub struct InvalidInputError {
    /// Offending field, including an array path where relevant (`obstacles[1].time`)
    pub field: String,
    /// Why the value was rejected
    pub reason: String,
}

impl InvalidInputError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "field is required")
    }

    pub fn not_positive(field: impl Into<String>) -> Self {
        Self::new(field, "must be a positive finite number")
    }
}

/// Aggregator contract violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Records must be sorted by timestamp ascending
    #[error("Records are not ordered by timestamp: record {index} is older than record {}", .index.saturating_sub(1))]
    OutOfOrder { index: usize },
}

/// Database operation errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found
    #[error("Record not found: {table}.{id}")]
    NotFound { table: String, id: String },
}

/// External protocol script errors
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No script is configured or present for the test type
    #[error("Protocol script not found: {path}")]
    ScriptNotFound { path: PathBuf },

    /// The interpreter could not be started
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The script did not finish in time and was killed
    #[error("Protocol script timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The script exited unsuccessfully
    #[error("Protocol script exited with {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// Pipe IO failed while talking to the script
    #[error("Protocol script IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inputs could not be encoded for the script
    #[error("Failed to encode script payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Unsupported format
    #[error("Unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File IO failure
    #[error("Export failed to {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Result type alias for athlab operations
pub type Result<T> = std::result::Result<T, AthlabError>;

impl AthlabError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AthlabError::Runner(RunnerError::Timeout { .. })
                | AthlabError::Database(DatabaseError::Sqlite(_))
                | AthlabError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AthlabError::InvalidInput(_) => ErrorSeverity::Warning,
            AthlabError::Database(DatabaseError::NotFound { .. }) => ErrorSeverity::Warning,
            AthlabError::Runner(RunnerError::Timeout { .. }) => ErrorSeverity::Warning,
            AthlabError::Aggregation(_) => ErrorSeverity::Critical,
            AthlabError::Database(DatabaseError::Serialization(_)) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP-equivalent status code for the failure
    pub fn status_code(&self) -> u16 {
        match self {
            AthlabError::InvalidInput(_) => 400,
            AthlabError::Database(DatabaseError::NotFound { .. }) => 404,
            AthlabError::Runner(RunnerError::Timeout { .. }) => 504,
            AthlabError::Runner(_) => 502,
            _ => 500,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AthlabError::InvalidInput(err) => {
                format!("Please check the '{}' value: {}", err.field, err.reason)
            }
            AthlabError::Database(DatabaseError::NotFound { table, id }) => match table.as_str() {
                "drills" => format!("No drill exists with id {}", id),
                "hrf_tests" => format!("No assessment is defined as {}", id),
                _ => format!("No test or summary exists with id {}", id),
            },
            AthlabError::Runner(RunnerError::ScriptNotFound { path }) => {
                format!("No protocol script installed at {}", path.display())
            }
            AthlabError::Runner(RunnerError::Timeout { seconds }) => {
                format!("The protocol script took longer than {}s and was stopped", seconds)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Programmer error or corrupted data
    Critical,
    /// Error that prevents the operation
    Error,
    /// Caller-side problem that does not indicate a fault
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = AthlabError::from(InvalidInputError::missing("jumpHeight"));
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = AthlabError::from(AggregationError::OutOfOrder { index: 3 });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_status_codes() {
        let err = AthlabError::from(InvalidInputError::not_positive("athleteWeight"));
        assert_eq!(err.status_code(), 400);

        let err = AthlabError::Database(DatabaseError::NotFound {
            table: "test_records".to_string(),
            id: "abc".to_string(),
        });
        assert_eq!(err.status_code(), 404);

        let err = AthlabError::Database(DatabaseError::NotFound {
            table: "drills".to_string(),
            id: "d9".to_string(),
        });
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.user_message(), "No drill exists with id d9");

        let err = AthlabError::Runner(RunnerError::Timeout { seconds: 30 });
        assert_eq!(err.status_code(), 504);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_input_names_field() {
        let err = InvalidInputError::not_positive("obstacles[1].time");
        assert!(err.to_string().contains("obstacles[1].time"));

        let err = AthlabError::from(err);
        assert!(err.user_message().contains("obstacles[1].time"));
    }

    #[test]
    fn test_out_of_order_message() {
        let err = AggregationError::OutOfOrder { index: 4 };
        assert!(err.to_string().contains("record 4 is older than record 3"));
    }
}

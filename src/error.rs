//! Error types for bulk operations

use thiserror::Error;

/// Errors that can occur during bulk inserts and temp table management
#[derive(Debug, Error)]
pub enum BulkError {
    /// Invalid or unsatisfiable request, raised before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A source value does not fit the destination column type
    #[error("Type mapping error: column '{column}' expected {expected}, got {actual}")]
    TypeMapping {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    /// DDL or COPY rejected by the store
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BulkError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn type_mapping(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMapping {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// True when the failure guarantees nothing reached the destination table.
    ///
    /// Mapping problems found mid-stream abort the COPY, so they are in this
    /// group as well.
    pub fn never_started(&self) -> bool {
        matches!(
            self,
            BulkError::Configuration(_) | BulkError::TypeMapping { .. } | BulkError::Json(_)
        )
    }

    /// True when the operation reached the store and was aborted.
    ///
    /// A temp table that saw an aborted operation should be released rather
    /// than reused.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            BulkError::Connection(_) | BulkError::Protocol(_) | BulkError::Cancelled
        )
    }
}

impl From<sqlx::Error> for BulkError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => BulkError::Protocol(db.to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => BulkError::Connection(err.to_string()),
            other => BulkError::Protocol(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BulkError>;

//! Crate-wide error types.

use std::time::Duration;

use thiserror::Error;

use crate::database::retry::is_sqlite_busy_error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Generation store timed out during {op} after {timeout:?}")]
    StorageTimeout { op: &'static str, timeout: Duration },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The generation store could not be reached, was busy, or did not answer
    /// in time. Schema, constraint and migration failures are permanent and
    /// do not count.
    pub fn is_storage_unavailable(&self) -> bool {
        match self {
            Self::StorageTimeout { .. } => true,
            Self::DatabaseSqlx(
                sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
                | sqlx::Error::Io(_),
            ) => true,
            Self::DatabaseSqlx(_) => is_sqlite_busy_error(self),
            _ => false,
        }
    }

    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        self.is_storage_unavailable()
    }
}

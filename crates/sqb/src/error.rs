//! Error types for sqb

use std::panic::Location;
use thiserror::Error;

/// Result type alias for sqb operations
pub type SqResult<T> = Result<T, SqError>;

/// Error types for query execution and row scanning.
///
/// Compiling a query never fails; every variant here is produced at
/// execution time.
#[derive(Debug, Error)]
pub enum SqError {
    /// Neither the call nor the query carried a database handle.
    #[error("DB cannot be nil")]
    MissingDb,

    /// Error reported by the database driver, passed through untouched.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    /// A scanned value could not be converted into the requested type.
    #[error("row scan failed on {location}: {message}")]
    Scan { location: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Sentinel that stops the row loop without reporting a failure.
    #[error("exit 0")]
    ExitPeacefully,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqError {
    /// Create a scan error annotated with a source location.
    pub fn scan(location: &Location<'_>, message: impl Into<String>) -> Self {
        Self::Scan {
            location: format!("{}:{}", location.file(), location.line()),
            message: message.into(),
        }
    }

    /// Wrap an arbitrary driver error.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Driver(Box::new(err))
    }

    /// Check if this is the peaceful-exit sentinel
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::ExitPeacefully)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a scan error
    pub fn is_scan(&self) -> bool {
        matches!(self, Self::Scan { .. })
    }
}

impl From<tokio_postgres::Error> for SqError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Driver(Box::new(err))
    }
}

//! Error types for connection operations.

use thiserror::Error;

/// Result type for connection operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by a [`crate::SqlConnection`].
#[derive(Debug, Error)]
pub enum DbError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection has been closed.
    #[error("connection is closed")]
    Closed,

    /// The dialect does not support the requested feature.
    #[error("{dialect} does not support {feature}")]
    Unsupported {
        /// Dialect name.
        dialect: String,
        /// The missing feature.
        feature: String,
    },

    /// A query expected to return a row returned none.
    #[error("query returned no rows: {0}")]
    NoRows(String),
}

impl DbError {
    /// Creates an unsupported feature error.
    pub fn unsupported(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }

    /// Returns the driver's extended result code, if this is a driver failure.
    #[must_use]
    pub fn extended_code(&self) -> Option<i32> {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => {
                Some(failure.extended_code)
            }
            _ => None,
        }
    }
}

//! SQL dialects.

use crate::error::DbError;
use std::fmt::Debug;

/// Vendor specific behavior of a SQL database.
///
/// Statement synthesis asks the dialect about the few places where
/// databases disagree: row locking reads, limit/offset syntax, how
/// generated keys are fetched and how driver errors read to a user.
pub trait Database: Send + Sync + Debug {
    /// Returns the dialect name.
    fn name(&self) -> &str;

    /// Returns true if `select ... for update` is supported.
    fn supports_select_for_update(&self) -> bool;

    /// Returns true if `for update nowait` is supported.
    fn supports_nowait(&self) -> bool;

    /// Returns true if a derived table in a `from` clause needs an alias.
    fn subquery_requires_alias(&self) -> bool {
        true
    }

    /// Returns the limit/offset clause, without a leading space.
    fn limit_offset_clause(&self, limit: Option<usize>, offset: Option<usize>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("limit {limit}")),
            (Some(limit), Some(offset)) => Some(format!("limit {limit} offset {offset}")),
            (None, Some(offset)) => Some(format!("offset {offset}")),
        }
    }

    /// Returns the query fetching the key generated by the last insert.
    ///
    /// `id_source` names the identity column or sequence backing it.
    fn auto_increment_query(&self, id_source: &str) -> String;

    /// Returns the query fetching the next value of a sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Unsupported`] if the database has no sequences.
    fn sequence_query(&self, sequence: &str) -> Result<String, DbError>;

    /// Translates a driver error into a message fit for a user.
    fn error_message(&self, error: &DbError) -> String {
        error.to_string()
    }
}

/// The SQLite dialect.
///
/// SQLite has no row locks; writers serialize on the database lock, which
/// [`crate::SqliteConnection`] takes up front with `begin immediate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Database for Sqlite {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn supports_select_for_update(&self) -> bool {
        false
    }

    fn supports_nowait(&self) -> bool {
        false
    }

    fn limit_offset_clause(&self, limit: Option<usize>, offset: Option<usize>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("limit {limit}")),
            (Some(limit), Some(offset)) => Some(format!("limit {limit} offset {offset}")),
            (None, Some(offset)) => Some(format!("limit -1 offset {offset}")),
        }
    }

    fn auto_increment_query(&self, _id_source: &str) -> String {
        "select last_insert_rowid()".to_string()
    }

    fn sequence_query(&self, _sequence: &str) -> Result<String, DbError> {
        Err(DbError::unsupported(self.name(), "sequences"))
    }

    fn error_message(&self, error: &DbError) -> String {
        use rusqlite::ffi;

        match error {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, message)) => {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        "Unique key constraint violation".to_string()
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        "Referential integrity constraint violation".to_string()
                    }
                    ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        "A required value is missing".to_string()
                    }
                    ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => {
                        "The record is locked by another user".to_string()
                    }
                    _ => message
                        .clone()
                        .unwrap_or_else(|| failure.to_string()),
                }
            }
            other => other.to_string(),
        }
    }
}

/// A standard SQL dialect with row locking and sequences.
///
/// Useful as the reference dialect when synthesizing statements for
/// databases reached through other drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard {
    nowait: bool,
}

impl Standard {
    /// Creates the dialect; `nowait` enables `for update nowait`.
    #[must_use]
    pub const fn new(nowait: bool) -> Self {
        Self { nowait }
    }
}

impl Database for Standard {
    fn name(&self) -> &str {
        "standard"
    }

    fn supports_select_for_update(&self) -> bool {
        true
    }

    fn supports_nowait(&self) -> bool {
        self.nowait
    }

    fn auto_increment_query(&self, id_source: &str) -> String {
        format!("select currval('{id_source}')")
    }

    fn sequence_query(&self, sequence: &str) -> Result<String, DbError> {
        Ok(format!("select nextval('{sequence}')"))
    }
}

//! Connection trait definition.

use crate::dialect::Database;
use crate::error::DbResult;
use crate::value::Value;

/// One result row, columns in select order.
pub type Row = Vec<Value>;

/// A live connection to a SQL database.
///
/// Connections execute statement text with positional `?` parameters. They
/// do not interpret the statements they run: entity mapping, SQL synthesis
/// and transaction policy all live above this trait.
///
/// # Invariants
///
/// - Parameters bind in slice order, one per `?` placeholder
/// - Outside of `begin`/`commit` every statement commits on its own
/// - `query` returns columns in the order the statement selects them
///
/// # Implementors
///
/// - [`super::SqliteConnection`] - SQLite through `rusqlite`
pub trait SqlConnection: Send {
    /// Returns the dialect describing this connection's database.
    fn database(&self) -> &dyn Database;

    /// Executes a statement that returns no rows.
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<usize>;

    /// Executes a query and collects its rows.
    ///
    /// When `max_rows` is set, reading stops once that many rows have been
    /// collected.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed, or
    /// if a row cannot be read.
    fn query(&mut self, sql: &str, params: &[Value], max_rows: Option<usize>)
        -> DbResult<Vec<Row>>;

    /// Executes a query expected to return a single value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DbError::NoRows`] if the query returns no rows.
    fn query_value(&mut self, sql: &str, params: &[Value]) -> DbResult<Value> {
        self.query(sql, params, Some(1))?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or_else(|| crate::DbError::NoRows(sql.to_string()))
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already active on the
    /// connection or the database refuses to start one.
    fn begin(&mut self) -> DbResult<()>;

    /// Commits the active transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&mut self) -> DbResult<()>;

    /// Rolls back the active transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    fn rollback(&mut self) -> DbResult<()>;

    /// Returns true if the connection still answers a trivial query.
    fn is_valid(&mut self) -> bool;
}

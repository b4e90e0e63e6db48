//! SQLite connection using `rusqlite`.

use crate::connection::{Row, SqlConnection};
use crate::dialect::{Database, Sqlite};
use crate::error::DbResult;
use crate::value::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Configuration for opening a [`SqliteConnection`].
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// How long a statement waits for a competing writer's lock.
    pub busy_timeout: Duration,
    /// Whether foreign key constraints are enforced.
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether foreign key constraints are enforced.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

/// A connection to a SQLite database.
///
/// Transactions start with `begin immediate`, so the write lock is held
/// from the first statement of a unit of work. This stands in for the
/// `select ... for update` row locks SQLite lacks.
pub struct SqliteConnection {
    conn: Connection,
    dialect: Sqlite,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteConnection {
    /// Opens (or creates) a database file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with(path, &SqliteConfig::default())
    }

    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or configured.
    pub fn open_with(path: impl AsRef<Path>, config: &SqliteConfig) -> DbResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite database");
        Self::configure(Connection::open(path)?, config)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_in_memory_with(&SqliteConfig::default())
    }

    /// Opens a private in-memory database with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory_with(config: &SqliteConfig) -> DbResult<Self> {
        Self::configure(Connection::open_in_memory()?, config)
    }

    fn configure(conn: Connection, config: &SqliteConfig) -> DbResult<Self> {
        conn.busy_timeout(config.busy_timeout)?;
        let foreign_keys = if config.foreign_keys { "on" } else { "off" };
        conn.execute_batch(&format!("pragma foreign_keys = {foreign_keys}"))?;
        Ok(Self {
            conn,
            dialect: Sqlite,
        })
    }

    /// Executes a batch of `;` separated statements without parameters.
    ///
    /// Intended for schema setup.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl SqlConnection for SqliteConnection {
    fn database(&self) -> &dyn Database {
        &self.dialect
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<usize> {
        debug!(sql, params = params.len(), "execute");
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter()))?)
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        max_rows: Option<usize>,
    ) -> DbResult<Vec<Row>> {
        debug!(sql, params = params.len(), "query");
        let mut stmt = self.conn.prepare_cached(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            if max_rows.is_some_and(|max| result.len() >= max) {
                break;
            }
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(Value::from(row.get_ref(index)?));
            }
            result.push(values);
        }
        trace!(rows = result.len(), "query fetched");
        Ok(result)
    }

    fn begin(&mut self) -> DbResult<()> {
        debug!("begin immediate");
        self.conn.execute_batch("begin immediate")?;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        debug!("commit");
        self.conn.execute_batch("commit")?;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        debug!("rollback");
        self.conn.execute_batch("rollback")?;
        Ok(())
    }

    fn is_valid(&mut self) -> bool {
        self.conn
            .query_row("select 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }
}

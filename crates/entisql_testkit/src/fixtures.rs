//! Test fixtures and database helpers.
//!
//! Provides engines over the demo domain, backed by an in-memory SQLite
//! database or by a file in a temporary directory.

use crate::domain;
use entisql_core::{Config, LocalEntityConnection};
use entisql_db::SqliteConnection;
use entisql_domain::{Entities, EntityType, Key, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// An engine over a demo database with automatic cleanup.
pub struct TestDatabase {
    /// The engine.
    pub connection: LocalEntityConnection,
    entities: Arc<Entities>,
    path: Option<PathBuf>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates an in-memory demo database with the default configuration.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory demo database.
    pub fn memory_with(config: Config) -> Self {
        let entities = demo_entities();
        let mut sqlite = SqliteConnection::open_in_memory().expect("Failed to open in-memory database");
        domain::install(&mut sqlite, true).expect("Failed to install demo schema");
        Self {
            connection: LocalEntityConnection::with_config(entities.clone(), sqlite, config),
            entities,
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a file-based demo database.
    ///
    /// Further engines over the same file come from
    /// [`TestDatabase::connect`].
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("scott.db");
        let mut sqlite = SqliteConnection::open(&path).expect("Failed to open file database");
        domain::install(&mut sqlite, true).expect("Failed to install demo schema");
        let entities = demo_entities();
        Self {
            connection: LocalEntityConnection::new(entities.clone(), sqlite),
            entities,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Opens another engine over the same database file.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases, which cannot be shared.
    pub fn connect(&self) -> LocalEntityConnection {
        let path = self.path.as_ref().expect("In-memory databases cannot be shared");
        let sqlite = SqliteConnection::open(path).expect("Failed to open file database");
        LocalEntityConnection::new(self.entities.clone(), sqlite)
    }

    /// Returns the demo domain.
    pub fn entities(&self) -> &Arc<Entities> {
        &self.entities
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the primary key of a single column key entity.
    pub fn key(&self, entity_type: &EntityType, value: impl Into<Value>) -> Key {
        self.entities
            .primary_key(entity_type, vec![value.into()])
            .expect("Failed to build primary key")
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = LocalEntityConnection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

/// Builds the demo domain for a fixture.
pub fn demo_entities() -> Arc<Entities> {
    Arc::new(domain::entities().expect("Demo domain must be consistent"))
}

/// Runs a test with a temporary in-memory demo database.
///
/// # Example
///
/// ```rust
/// use entisql_core::EntityConnection;
/// use entisql_domain::condition;
/// use entisql_testkit::domain::{DEMO_EMPLOYEES, EMP};
/// use entisql_testkit::with_test_db;
///
/// with_test_db(|db| {
///     assert_eq!(db.row_count(&condition::all(EMP)).unwrap(), DEMO_EMPLOYEES);
/// });
/// ```
pub fn with_test_db<F, R>(f: F) -> R
where
    F: FnOnce(&TestDatabase) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db)
}

/// Runs a test with a temporary file-based demo database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&TestDatabase) -> R,
{
    let test_db = TestDatabase::file();
    f(&test_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEMO_EMPLOYEES, EMP};
    use entisql_core::EntityConnection;
    use entisql_domain::condition;

    #[test]
    fn memory_database_has_demo_rows() {
        let db = TestDatabase::memory();
        assert!(db.path().is_none());
        assert_eq!(db.row_count(&condition::all(EMP)).unwrap(), DEMO_EMPLOYEES);
    }

    #[test]
    fn file_databases_can_be_shared() {
        with_file_db(|db| {
            assert!(db.path().unwrap().exists());
            let other = db.connect();
            other.delete_key(&db.key(&EMP, 7369)).unwrap();
            assert_eq!(db.row_count(&condition::all(EMP)).unwrap(), DEMO_EMPLOYEES - 1);
        });
    }
}

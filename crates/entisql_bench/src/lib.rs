//! Benchmark utilities.

#![warn(missing_docs)]

use entisql_core::{Config, LocalEntityConnection};
use entisql_db::SqliteConnection;
use entisql_domain::{Entities, Entity};
use entisql_testkit::domain::{self, EMP, EMP_DEPT, EMP_HIREDATE, EMP_ID, EMP_JOB, EMP_NAME, EMP_SAL};
use std::sync::Arc;

/// First employee number used by [`employees`], above the demo rows.
pub const FIRST_ID: i64 = 100_000;

/// Opens an engine over an in-memory demo database.
pub fn demo_connection(config: Config) -> LocalEntityConnection {
    let entities = Arc::new(domain::entities().unwrap());
    let mut sqlite = SqliteConnection::open_in_memory().unwrap();
    domain::install(&mut sqlite, true).unwrap();
    LocalEntityConnection::with_config(entities, sqlite, config)
}

/// Builds `count` employees with consecutive ids starting at `first`.
pub fn employees(entities: &Entities, first: i64, count: usize) -> Vec<Entity> {
    (first..)
        .take(count)
        .map(|id| {
            entities
                .entity(&EMP)
                .unwrap()
                .with(&EMP_ID, id)
                .with(&EMP_NAME, format!("EMP{id}"))
                .with(&EMP_JOB, "CLERK")
                .with(&EMP_HIREDATE, "2024-01-15")
                .with(&EMP_SAL, 1000.0)
                .with(&EMP_DEPT, 20 + (id % 2) * 10)
                .build()
                .unwrap()
        })
        .collect()
}

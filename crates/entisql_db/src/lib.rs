//! # entisql DB
//!
//! Connection seam and SQL dialects for entisql.
//!
//! This crate is the lowest layer of the workspace. It knows nothing about
//! entities or conditions: it executes statement text with positional
//! parameters and hands back rows of [`Value`]s.
//!
//! ## Design Principles
//!
//! - A connection executes one statement at a time (blocking)
//! - Vendor differences live behind the [`Database`] dialect trait
//! - Transactions are demarcated explicitly with `begin`/`commit`/`rollback`;
//!   outside of them every statement auto-commits
//!
//! ## Available Connections
//!
//! - [`SqliteConnection`] - SQLite through `rusqlite`
//!
//! ## Example
//!
//! ```rust
//! use entisql_db::{SqlConnection, SqliteConnection, Value};
//!
//! let mut conn = SqliteConnection::open_in_memory().unwrap();
//! conn.execute_batch("create table t(id integer primary key, name text)").unwrap();
//! conn.execute("insert into t(id, name) values(?, ?)", &[Value::from(1), Value::from("a")])
//!     .unwrap();
//! let rows = conn.query("select name from t", &[], None).unwrap();
//! assert_eq!(rows[0][0], Value::from("a"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod dialect;
mod error;
mod sqlite;
mod value;

pub use connection::{Row, SqlConnection};
pub use dialect::{Database, Sqlite, Standard};
pub use error::{DbError, DbResult};
pub use sqlite::{SqliteConfig, SqliteConnection};
pub use value::Value;

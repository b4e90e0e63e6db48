//! # entisql Core
//!
//! The entity persistence engine for entisql.
//!
//! This crate provides:
//! - [`EntityConnection`], entity level access to a database
//! - [`LocalEntityConnection`], the engine over one SQL connection
//! - SQL statement synthesis in [`queries`]
//! - Optimistic locking on update, by re-selecting and comparing rows
//! - Foreign key resolution to a configurable depth
//! - Registered functions and procedures run against the connection
//!
//! ## Example
//!
//! ```rust
//! use entisql_core::{Config, EntityConnection, LocalEntityConnection};
//! use entisql_db::SqliteConnection;
//! use entisql_domain::condition::{self, column};
//! use entisql_domain::{
//!     Attribute, ColumnDefinition, Entities, EntityDefinition, EntityType, ForeignKey,
//!     ForeignKeyDefinition, Reference, ValueType,
//! };
//! use std::sync::Arc;
//!
//! const DEPT: EntityType = EntityType::new("dept");
//! const DEPT_ID: Attribute = Attribute::new(DEPT, "deptno");
//! const EMP: EntityType = EntityType::new("emp");
//! const EMP_ID: Attribute = Attribute::new(EMP, "empno");
//! const EMP_DEPT: Attribute = Attribute::new(EMP, "deptno");
//! const EMP_DEPT_REFS: &[Reference] = &[Reference::new(EMP_DEPT, DEPT_ID)];
//! const EMP_DEPT_FK: ForeignKey = ForeignKey::new(EMP, "dept_fk", DEPT, EMP_DEPT_REFS);
//!
//! let entities = Arc::new(
//!     Entities::builder("scott")
//!         .add(
//!             EntityDefinition::builder(DEPT, "dept")
//!                 .column(ColumnDefinition::primary_key(DEPT_ID, ValueType::Integer))
//!                 .build(),
//!         )
//!         .add(
//!             EntityDefinition::builder(EMP, "emp")
//!                 .column(ColumnDefinition::primary_key(EMP_ID, ValueType::Integer))
//!                 .column(ColumnDefinition::new(EMP_DEPT, ValueType::Integer))
//!                 .foreign_key(ForeignKeyDefinition::new(EMP_DEPT_FK))
//!                 .build(),
//!         )
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut sqlite = SqliteConnection::open_in_memory().unwrap();
//! sqlite
//!     .execute_batch(
//!         "create table dept(deptno integer primary key);
//!          create table emp(empno integer primary key, deptno integer references dept(deptno));
//!          insert into dept values(10);
//!          insert into emp values(1, 10);",
//!     )
//!     .unwrap();
//!
//! let connection = LocalEntityConnection::with_config(entities, sqlite, Config::new().in_clause_limit(500));
//! let employees = connection.select_where(&column(&EMP_DEPT).equal_to(10)).unwrap();
//! assert!(employees[0].referenced(&EMP_DEPT_FK).is_some());
//! assert_eq!(connection.row_count(&condition::all(EMP)).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod functions;
mod local;
mod packer;
pub mod queries;

pub use config::Config;
pub use connection::EntityConnection;
pub use error::{EntityError, EntityResult};
pub use functions::{DatabaseFunction, DatabaseProcedure, Functions};
pub use local::LocalEntityConnection;
pub use packer::EntityPacker;

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # entisql Testkit
//!
//! Test utilities for entisql.
//!
//! This crate provides:
//! - The demo domain: a small personnel schema with its SQL tables
//! - Test fixtures running an engine over in-memory or file databases
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use entisql_testkit::prelude::*;
//! use entisql_core::EntityConnection;
//!
//! with_test_db(|db| {
//!     let king = db.select_by_key(&db.key(&EMP, 7839)).unwrap();
//!     assert_eq!(king.value(&EMP_NAME), entisql_domain::Value::from("KING"));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod domain;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::domain::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;

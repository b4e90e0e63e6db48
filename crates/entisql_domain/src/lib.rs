//! # entisql Domain
//!
//! Schema, entity values and the condition algebra for entisql.
//!
//! This crate describes *what* is stored: entity types and their
//! attributes, how each maps onto a table, the entities themselves and the
//! conditions used to find them. It executes nothing; the engine in
//! `entisql_core` turns these descriptions into statements.
//!
//! ## Declaring a domain
//!
//! Entity types and attributes are plain values, usually declared as
//! constants:
//!
//! ```rust
//! use entisql_domain::{
//!     Attribute, ColumnDefinition, Entities, EntityDefinition, EntityType, ValueType,
//! };
//!
//! const DEPT: EntityType = EntityType::new("scott.dept");
//! const DEPT_ID: Attribute = Attribute::new(DEPT, "deptno");
//! const DEPT_NAME: Attribute = Attribute::new(DEPT, "dname");
//!
//! let entities = Entities::builder("scott")
//!     .add(
//!         EntityDefinition::builder(DEPT, "scott.dept")
//!             .column(ColumnDefinition::primary_key(DEPT_ID, ValueType::Integer))
//!             .column(ColumnDefinition::new(DEPT_NAME, ValueType::String))
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let sales = entities
//!     .entity(&DEPT)
//!     .unwrap()
//!     .with(&DEPT_ID, 10)
//!     .with(&DEPT_NAME, "SALES")
//!     .build()
//!     .unwrap();
//! assert!(!sales.is_modified());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attribute;
pub mod condition;
mod definition;
mod entities;
mod entity;
mod error;
mod key;
mod key_generator;
mod value_type;

pub use attribute::{Attribute, EntityType, ForeignKey, Reference};
pub use definition::{
    ColumnDefinition, DerivedDefinition, DerivedProvider, EntityDefinition, EntityDefinitionBuilder,
    ForeignKeyDefinition, SelectQuery, DEFAULT_FETCH_DEPTH,
};
pub use entisql_db::Value;
pub use entities::{Entities, EntitiesBuilder};
pub use entity::{Entity, EntityBuilder};
pub use error::{DomainError, DomainResult};
pub use key::Key;
pub use key_generator::{
    AutomaticKeyGenerator, DefaultKeyGenerator, KeyGenerator, QueriedKeyGenerator, SequenceKeyGenerator,
};
pub use value_type::{BooleanConverter, ColumnConverter, ValueType};

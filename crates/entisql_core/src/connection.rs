//! The entity connection trait.

use crate::error::{EntityError, EntityResult};
use entisql_db::Value;
use entisql_domain::condition::{self, Condition, Select, Update};
use entisql_domain::{Attribute, Entities, Entity, EntityType, Key};
use std::collections::HashMap;

/// Entity level access to a database.
///
/// All operations are synchronous and run in call order. Writes outside of
/// an explicit transaction commit on success and roll back on failure;
/// inside one, demarcation is left to the caller.
///
/// # Implementors
///
/// - [`crate::LocalEntityConnection`] - one engine over one SQL connection
pub trait EntityConnection {
    /// Returns the domain this connection maps.
    fn entities(&self) -> &Entities;

    /// Returns true if the underlying connection is usable.
    fn is_connected(&self) -> bool;

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::TransactionState`] if one is already open.
    fn begin_transaction(&self) -> EntityResult<()>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::TransactionState`] if none is open.
    fn commit_transaction(&self) -> EntityResult<()>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::TransactionState`] if none is open.
    fn rollback_transaction(&self) -> EntityResult<()>;

    /// Returns true while a transaction started with
    /// [`begin_transaction`](Self::begin_transaction) is open.
    fn is_transaction_open(&self) -> bool;

    /// Returns true if updates verify rows are unchanged.
    fn optimistic_locking(&self) -> bool;

    /// Enables or disables optimistic locking.
    fn set_optimistic_locking(&self, enabled: bool);

    /// Returns true if foreign key resolution honours fetch depths.
    fn limit_fetch_depth(&self) -> bool;

    /// Enables or disables fetch depth limits.
    fn set_limit_fetch_depth(&self, enabled: bool);

    /// Inserts entities and returns their primary keys in input order.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::ReadOnlyViolation`] for read-only types,
    /// [`EntityError::InvalidEntity`] if there is nothing to insert, or a
    /// database error.
    fn insert(&self, entities: &[Entity]) -> EntityResult<Vec<Key>>;

    /// Inserts entities and returns them as stored.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    fn insert_select(&self, entities: &[Entity]) -> EntityResult<Vec<Entity>>;

    /// Inserts one entity and returns its primary key.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    fn insert_one(&self, entity: &Entity) -> EntityResult<Key> {
        self.insert(std::slice::from_ref(entity))?
            .pop()
            .ok_or_else(|| EntityError::invalid_entity("insert returned no key"))
    }

    /// Writes modified entities and returns them as stored, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidEntity`] for unmodified entities,
    /// [`EntityError::RecordModified`] if optimistic locking finds a row
    /// changed or deleted, or a database error.
    fn update(&self, entities: &[Entity]) -> EntityResult<Vec<Entity>>;

    /// Updates one entity and returns it as stored.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    fn update_one(&self, entity: &Entity) -> EntityResult<Entity> {
        self.update(std::slice::from_ref(entity))?
            .pop()
            .ok_or(EntityError::RecordNotFound)
    }

    /// Sets column values on every row matching a condition and returns
    /// the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidAttribute`] if a value targets a
    /// column that is not updatable, or a database error.
    fn update_where(&self, update: &Update) -> EntityResult<usize>;

    /// Deletes the rows matching a condition and returns how many.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::ReadOnlyViolation`] for read-only types, or a
    /// database error.
    fn delete_where(&self, condition: &Condition) -> EntityResult<usize>;

    /// Deletes rows by primary key and returns how many.
    ///
    /// # Errors
    ///
    /// See [`delete_where`](Self::delete_where).
    fn delete_keys(&self, keys: &[Key]) -> EntityResult<usize>;

    /// Deletes one row by primary key and returns how many were deleted.
    ///
    /// # Errors
    ///
    /// See [`delete_where`](Self::delete_where).
    fn delete_key(&self, key: &Key) -> EntityResult<usize> {
        self.delete_keys(std::slice::from_ref(key))
    }

    /// Selects entities, resolving foreign keys.
    ///
    /// # Errors
    ///
    /// Returns a condition or attribute error, or a database error.
    fn select(&self, select: &Select) -> EntityResult<Vec<Entity>>;

    /// Selects the entities matching `condition`.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    fn select_where(&self, condition: &Condition) -> EntityResult<Vec<Entity>> {
        self.select(&Select::where_(condition.clone()))
    }

    /// Selects entities by primary key.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    fn select_keys(&self, keys: &[Key]) -> EntityResult<Vec<Entity>>;

    /// Selects exactly one entity.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::RecordNotFound`] or
    /// [`EntityError::MultipleRecordsFound`] when the select does not match
    /// exactly one row.
    fn select_single(&self, select: &Select) -> EntityResult<Entity> {
        let mut entities = self.select(select)?;
        match entities.len() {
            0 => Err(EntityError::RecordNotFound),
            1 => entities.pop().ok_or(EntityError::RecordNotFound),
            _ => Err(EntityError::MultipleRecordsFound),
        }
    }

    /// Selects the entity with primary key `key`.
    ///
    /// # Errors
    ///
    /// See [`select_single`](Self::select_single).
    fn select_by_key(&self, key: &Key) -> EntityResult<Entity> {
        self.select_single(&Select::where_(condition::key(key)))
    }

    /// Counts the rows matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns a database error, also when the count query yields no row.
    fn row_count(&self, condition: &Condition) -> EntityResult<usize>;

    /// Returns the distinct non-null values of a column among the rows
    /// matching `condition`, ordered.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Unsupported`] for entity types selected with a
    /// custom query.
    fn select_values(&self, attribute: &Attribute, condition: &Condition) -> EntityResult<Vec<Value>>;

    /// Returns the rows referencing `entities` through non-soft foreign
    /// keys, by referencing entity type.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn dependencies(&self, entities: &[Entity]) -> EntityResult<HashMap<EntityType, Vec<Entity>>>;

    /// Reads a blob column of one row; `None` if it is null.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidAttributeType`] if `attribute` is not a
    /// blob column.
    fn read_blob(&self, key: &Key, attribute: &Attribute) -> EntityResult<Option<Vec<u8>>>;

    /// Writes a blob column of one row.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidAttributeType`] if `attribute` is not a
    /// blob column.
    fn write_blob(&self, key: &Key, attribute: &Attribute, data: &[u8]) -> EntityResult<()>;

    /// Runs the function registered as `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::FunctionNotFound`] for an unknown id, or the
    /// function's own error.
    fn execute_function(&self, id: &str, arguments: &[Value]) -> EntityResult<Value>;

    /// Runs the procedure registered as `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::FunctionNotFound`] for an unknown id, or the
    /// procedure's own error.
    fn execute_procedure(&self, id: &str, arguments: &[Value]) -> EntityResult<()>;
}

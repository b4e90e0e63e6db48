//! Primary key generation.

use crate::definition::EntityDefinition;
use crate::entity::Entity;
use entisql_db::{DbResult, SqlConnection, Value};
use std::fmt::Debug;

/// Produces primary key values on insert.
///
/// The engine calls [`before_insert`](Self::before_insert) before building
/// the insert statement and [`after_insert`](Self::after_insert) right after
/// executing it, on the same connection and inside the same transaction.
/// A returned value is put into the entity's single primary key column.
pub trait KeyGenerator: Send + Sync + Debug {
    /// Returns true if primary key columns are part of the insert statement.
    fn inserted(&self) -> bool {
        true
    }

    /// Runs before the insert.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching the key fails.
    fn before_insert(
        &self,
        _definition: &EntityDefinition,
        _entity: &Entity,
        _connection: &mut dyn SqlConnection,
    ) -> DbResult<Option<Value>> {
        Ok(None)
    }

    /// Runs after the insert.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching the key fails.
    fn after_insert(
        &self,
        _definition: &EntityDefinition,
        _entity: &Entity,
        _connection: &mut dyn SqlConnection,
    ) -> DbResult<Option<Value>> {
        Ok(None)
    }
}

/// Keys are supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyGenerator;

impl KeyGenerator for DefaultKeyGenerator {}

/// Keys are assigned by the database (identity or auto increment column)
/// and read back after the insert.
#[derive(Debug, Clone)]
pub struct AutomaticKeyGenerator {
    id_source: String,
}

impl AutomaticKeyGenerator {
    /// Creates a generator; `id_source` names the table or sequence behind
    /// the identity column, for dialects that need it.
    pub fn new(id_source: impl Into<String>) -> Self {
        Self {
            id_source: id_source.into(),
        }
    }
}

impl KeyGenerator for AutomaticKeyGenerator {
    fn inserted(&self) -> bool {
        false
    }

    fn after_insert(
        &self,
        _definition: &EntityDefinition,
        _entity: &Entity,
        connection: &mut dyn SqlConnection,
    ) -> DbResult<Option<Value>> {
        let query = connection.database().auto_increment_query(&self.id_source);
        connection.query_value(&query, &[]).map(Some)
    }
}

/// Keys come from a database sequence, fetched before the insert unless the
/// entity already has a key.
#[derive(Debug, Clone)]
pub struct SequenceKeyGenerator {
    sequence: String,
}

impl SequenceKeyGenerator {
    /// Creates a generator drawing from `sequence`.
    pub fn new(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn before_insert(
        &self,
        _definition: &EntityDefinition,
        entity: &Entity,
        connection: &mut dyn SqlConnection,
    ) -> DbResult<Option<Value>> {
        if !entity.key().is_null() {
            return Ok(None);
        }
        let query = connection.database().sequence_query(&self.sequence)?;
        connection.query_value(&query, &[]).map(Some)
    }
}

/// Keys are fetched with a custom query before the insert unless the entity
/// already has a key.
#[derive(Debug, Clone)]
pub struct QueriedKeyGenerator {
    query: String,
}

impl QueriedKeyGenerator {
    /// Creates a generator running `query`, which selects a single value.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

impl KeyGenerator for QueriedKeyGenerator {
    fn before_insert(
        &self,
        _definition: &EntityDefinition,
        entity: &Entity,
        connection: &mut dyn SqlConnection,
    ) -> DbResult<Option<Value>> {
        if !entity.key().is_null() {
            return Ok(None);
        }
        connection.query_value(&self.query, &[]).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, EntityType};
    use crate::definition::ColumnDefinition;
    use crate::value_type::ValueType;
    use entisql_db::SqliteConnection;
    use std::sync::Arc;

    const ITEM: EntityType = EntityType::new("item");
    const ITEM_ID: Attribute = Attribute::new(ITEM, "id");

    fn item() -> Arc<EntityDefinition> {
        Arc::new(
            EntityDefinition::builder(ITEM, "item")
                .column(ColumnDefinition::primary_key(ITEM_ID, ValueType::Integer))
                .build(),
        )
    }

    fn connection() -> SqliteConnection {
        let mut connection = SqliteConnection::open_in_memory().unwrap();
        connection
            .execute_batch("create table item(id integer primary key autoincrement)")
            .unwrap();
        connection
    }

    #[test]
    fn automatic_reads_back_last_insert() {
        let definition = item();
        let entity = Entity::new(definition.clone());
        let mut connection = connection();
        connection
            .execute("insert into item default values", &[])
            .unwrap();
        let generator = AutomaticKeyGenerator::new("item");
        assert!(!generator.inserted());
        let key = generator
            .after_insert(&definition, &entity, &mut connection)
            .unwrap();
        assert_eq!(key, Some(Value::Integer(1)));
    }

    #[test]
    fn queried_skips_entities_with_keys() {
        let definition = item();
        let mut connection = connection();
        let generator = QueriedKeyGenerator::new("select 42");

        let empty = Entity::new(definition.clone());
        let key = generator
            .before_insert(&definition, &empty, &mut connection)
            .unwrap();
        assert_eq!(key, Some(Value::Integer(42)));

        let keyed = Entity::builder(definition.clone()).with(&ITEM_ID, 7).build().unwrap();
        let key = generator
            .before_insert(&definition, &keyed, &mut connection)
            .unwrap();
        assert_eq!(key, None);
    }

    #[test]
    fn sequences_need_dialect_support() {
        let definition = item();
        let mut connection = connection();
        let entity = Entity::new(definition.clone());
        let result = SequenceKeyGenerator::new("item_seq").before_insert(&definition, &entity, &mut connection);
        assert!(result.is_err());
    }
}

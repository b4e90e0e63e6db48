//! The local entity connection.

mod fetch;
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::connection::EntityConnection;
use crate::error::{EntityError, EntityResult};
use crate::functions::Functions;
use crate::packer::EntityPacker;
use crate::queries::{self, SelectStatement};
use entisql_db::{DbError, Row, SqlConnection, Value};
use entisql_domain::condition::{self, column, Condition, Select, Update};
use entisql_domain::{
    Attribute, ColumnDefinition, DomainError, Entities, Entity, EntityDefinition, EntityType, Key,
};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// An [`EntityConnection`] over one database connection.
///
/// Every operation runs inside one critical section over the connection.
/// The lock is reentrant, so registered functions and procedures may call
/// back into the same connection from the thread running them.
///
/// Writes outside an explicit transaction run in an implicit one that is
/// committed on success and rolled back on failure. Rollback failures are
/// logged, never returned, so the original error is what the caller sees.
///
/// # Example
///
/// ```rust
/// use entisql_core::{EntityConnection, LocalEntityConnection};
/// use entisql_db::SqliteConnection;
/// use entisql_domain::condition::{column, Select};
/// use entisql_domain::{Attribute, ColumnDefinition, Entities, EntityDefinition, EntityType, ValueType};
/// use std::sync::Arc;
///
/// const DEPT: EntityType = EntityType::new("dept");
/// const DEPT_ID: Attribute = Attribute::new(DEPT, "deptno");
/// const DEPT_NAME: Attribute = Attribute::new(DEPT, "dname");
///
/// let entities = Arc::new(
///     Entities::builder("scott")
///         .add(
///             EntityDefinition::builder(DEPT, "dept")
///                 .column(ColumnDefinition::primary_key(DEPT_ID, ValueType::Integer))
///                 .column(ColumnDefinition::new(DEPT_NAME, ValueType::String))
///                 .build(),
///         )
///         .build()
///         .unwrap(),
/// );
/// let mut sqlite = SqliteConnection::open_in_memory().unwrap();
/// sqlite.execute_batch("create table dept(deptno integer primary key, dname text)").unwrap();
///
/// let connection = LocalEntityConnection::new(entities.clone(), sqlite);
/// let sales = entities.entity(&DEPT).unwrap().with(&DEPT_ID, 10).with(&DEPT_NAME, "SALES").build().unwrap();
/// connection.insert(&[sales]).unwrap();
///
/// let found = connection.select(&Select::where_(column(&DEPT_NAME).like("S%"))).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
pub struct LocalEntityConnection {
    entities: Arc<Entities>,
    functions: Functions,
    config: Config,
    state: ReentrantMutex<RefCell<State>>,
}

struct State {
    connection: Box<dyn SqlConnection>,
    transaction_open: bool,
    optimistic_locking: bool,
    limit_fetch_depth: bool,
}

impl State {
    fn execute(&mut self, sql: &str, values: &[Value]) -> EntityResult<usize> {
        debug!(sql, parameters = values.len(), "execute");
        self.connection
            .execute(sql, values)
            .map_err(|source| self.database_error(source, Some(sql), values))
    }

    fn query(&mut self, sql: &str, values: &[Value], max_rows: Option<usize>) -> EntityResult<Vec<Row>> {
        debug!(sql, parameters = values.len(), "query");
        self.connection
            .query(sql, values, max_rows)
            .map_err(|source| self.database_error(source, Some(sql), values))
    }

    fn query_value(&mut self, sql: &str, values: &[Value]) -> EntityResult<Value> {
        debug!(sql, parameters = values.len(), "query value");
        self.connection
            .query_value(sql, values)
            .map_err(|source| self.database_error(source, Some(sql), values))
    }

    fn begin(&mut self) -> EntityResult<()> {
        self.connection
            .begin()
            .map_err(|source| self.database_error(source, None, &[]))
    }

    fn commit(&mut self) -> EntityResult<()> {
        self.connection
            .commit()
            .map_err(|source| self.database_error(source, None, &[]))
    }

    fn rollback_quietly(&mut self) {
        if let Err(source) = self.connection.rollback() {
            error!(error = %source, "exception while performing a quiet rollback");
        }
    }

    fn database_error(&self, source: DbError, sql: Option<&str>, values: &[Value]) -> EntityError {
        let message = self.connection.database().error_message(&source);
        error!(sql, ?values, %message, error = %source, "statement failed");
        EntityError::Database {
            message,
            sql: sql.map(str::to_string),
            values: values.to_vec(),
            source,
        }
    }
}

impl LocalEntityConnection {
    /// Creates a connection with the default configuration.
    pub fn new(entities: Arc<Entities>, connection: impl SqlConnection + 'static) -> Self {
        Self::with_config(entities, connection, Config::default())
    }

    /// Creates a connection.
    pub fn with_config(entities: Arc<Entities>, connection: impl SqlConnection + 'static, config: Config) -> Self {
        let state = State {
            connection: Box::new(connection),
            transaction_open: false,
            optimistic_locking: config.optimistic_locking,
            limit_fetch_depth: config.limit_fetch_depth,
        };
        debug!(domain = entities.domain_name(), "entity connection created");
        Self {
            entities,
            functions: Functions::default(),
            config,
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    /// Sets the functions and procedures available to
    /// [`EntityConnection::execute_function`] and
    /// [`EntityConnection::execute_procedure`].
    #[must_use]
    pub fn functions(mut self, functions: Functions) -> Self {
        self.functions = functions;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn definition(&self, entity_type: &EntityType) -> EntityResult<&Arc<EntityDefinition>> {
        Ok(self.entities.definition(entity_type)?)
    }

    fn writable_definition(&self, entity_type: &EntityType) -> EntityResult<&Arc<EntityDefinition>> {
        let definition = self.definition(entity_type)?;
        if definition.is_read_only() {
            return Err(EntityError::read_only(entity_type));
        }
        Ok(definition)
    }

    /// Runs a read in autocommit mode, or inside the open transaction.
    fn read<T>(&self, operation: impl FnOnce(&mut State) -> EntityResult<T>) -> EntityResult<T> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        operation(&mut state)
    }

    /// Runs a write inside the open transaction, or an implicit one.
    fn write<T>(&self, operation: impl FnOnce(&mut State) -> EntityResult<T>) -> EntityResult<T> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let implicit = !state.transaction_open;
        if implicit {
            state.begin()?;
        }
        let result = operation(&mut state);
        if implicit {
            match &result {
                Ok(_) => {
                    if let Err(error) = state.commit() {
                        state.rollback_quietly();
                        return Err(error);
                    }
                }
                Err(_) => state.rollback_quietly(),
            }
        }
        result
    }

    fn render(&self, condition: &Condition, definition: &EntityDefinition) -> EntityResult<String> {
        Ok(condition.to_sql_with_limit(definition, self.config.in_clause_limit)?)
    }

    /// Condition values converted for their columns, in placeholder order.
    fn bind(condition: &Condition, definition: &EntityDefinition) -> Vec<Value> {
        condition
            .attributes()
            .iter()
            .zip(condition.values())
            .map(|(attribute, value)| match definition.find_column(attribute) {
                Some(column) => column.to_column(&value),
                None => value,
            })
            .collect()
    }

    fn key_condition(key: &Key) -> EntityResult<Condition> {
        if key.components().is_empty() {
            return Err(EntityError::InvalidCondition(format!(
                "{} has no primary key",
                key.entity_type()
            )));
        }
        Ok(condition::key(key))
    }

    fn select_columns<'d>(
        definition: &'d EntityDefinition,
        attributes: Option<&[Attribute]>,
    ) -> EntityResult<Vec<&'d ColumnDefinition>> {
        let Some(attributes) = attributes else {
            return Ok(definition.selected_columns());
        };
        if definition.select_query().is_some() {
            return Err(EntityError::unsupported(format!(
                "attribute subsets are not supported for {}, which has a custom select query",
                definition.entity_type()
            )));
        }
        let mut wanted: HashSet<&Attribute> = HashSet::new();
        for attribute in attributes {
            if definition.find_column(attribute).is_some() {
                wanted.insert(attribute);
            } else if let Some(fk) = definition.foreign_key(attribute) {
                wanted.extend(fk.foreign_key().references().iter().map(|r| &r.column));
            } else {
                return Err(DomainError::invalid_attribute(attribute, "not a column or foreign key attribute").into());
            }
        }
        Ok(definition
            .columns()
            .iter()
            .filter(|c| c.is_primary_key() || wanted.contains(c.attribute()))
            .collect())
    }

    /// Runs one select and packs its rows, without resolving references.
    fn query_entities(
        &self,
        state: &mut State,
        definition: &Arc<EntityDefinition>,
        select: &Select,
    ) -> EntityResult<Vec<Entity>> {
        let columns = Self::select_columns(definition, select.get_attributes())?;
        let where_clause = self.render(select.condition(), definition)?;
        let order_by = select
            .get_order_by()
            .or(definition.order_by())
            .map(|order_by| order_by.to_sql(definition))
            .transpose()?;
        let sql = SelectStatement::new(definition, queries::columns_clause(&columns))
            .where_clause(where_clause)
            .order_by(order_by)
            .page(select.get_limit(), select.get_offset())
            .for_update(select.is_for_update())
            .to_sql(state.connection.database());
        let values = Self::bind(select.condition(), definition);
        let rows = state.query(&sql, &values, select.get_fetch_count())?;
        EntityPacker::new(definition, columns).pack(rows, select.get_fetch_count())
    }

    fn select_entities(&self, state: &mut State, select: &Select) -> EntityResult<Vec<Entity>> {
        let definition = self.definition(select.entity_type())?;
        let entities = self.query_entities(state, definition, select)?;
        self.resolve_foreign_keys(state, definition, entities, select)
    }

    /// Selects entities by key, returned in the order of `keys`.
    fn select_in_order(&self, state: &mut State, keys: &[Key]) -> EntityResult<Vec<Entity>> {
        let mut by_key: HashMap<Key, Entity> = HashMap::new();
        for (_, group) in group_by_type(keys.iter(), |key| key.entity_type().clone()) {
            let group: Vec<Key> = group.into_iter().cloned().collect();
            let select = Select::where_(condition::keys(&group)?);
            by_key.extend(
                self.select_entities(state, &select)?
                    .into_iter()
                    .map(|entity| (entity.key(), entity)),
            );
        }
        keys.iter()
            .map(|key| by_key.get(key).cloned().ok_or(EntityError::RecordNotFound))
            .collect()
    }

    fn insert_entities(&self, state: &mut State, entities: &[Entity]) -> EntityResult<Vec<Key>> {
        let mut keys = Vec::with_capacity(entities.len());
        for entity in entities {
            let definition = self.definition(entity.entity_type())?;
            let generator = definition.key_generator();
            let mut entity = entity.clone();
            let generated = generator
                .before_insert(definition, &entity, state.connection.as_mut())
                .map_err(|source| state.database_error(source, None, &[]))?;
            if let Some(value) = generated {
                put_generated_key(definition, &mut entity, value)?;
            }
            let columns: Vec<&ColumnDefinition> = definition
                .columns()
                .iter()
                .filter(|c| {
                    let insertable = if c.is_primary_key() {
                        generator.inserted()
                    } else {
                        c.is_insertable()
                    };
                    insertable && !entity.value(c.attribute()).is_null()
                })
                .collect();
            if columns.is_empty() {
                return Err(EntityError::invalid_entity(format!(
                    "no values to insert for {}",
                    definition.entity_type()
                )));
            }
            let values: Vec<Value> = columns
                .iter()
                .map(|c| c.to_column(&entity.value(c.attribute())))
                .collect();
            state.execute(&queries::insert_query(definition, &columns), &values)?;
            let generated = generator
                .after_insert(definition, &entity, state.connection.as_mut())
                .map_err(|source| state.database_error(source, None, &[]))?;
            if let Some(value) = generated {
                put_generated_key(definition, &mut entity, value)?;
            }
            keys.push(entity.key());
        }
        Ok(keys)
    }

    /// Re-reads the rows behind `entities` and fails if any of them changed
    /// or disappeared since the entities were selected.
    fn lock_and_verify(
        &self,
        state: &mut State,
        definition: &Arc<EntityDefinition>,
        entities: &[&Entity],
    ) -> EntityResult<()> {
        let original_keys: Vec<Key> = entities.iter().map(|entity| entity.original_key()).collect();
        let select = Select::where_(condition::keys(&original_keys)?).for_update();
        let current: HashMap<Key, Entity> = self
            .query_entities(state, definition, &select)?
            .into_iter()
            .map(|entity| (entity.key(), entity))
            .collect();
        for (entity, key) in entities.iter().zip(&original_keys) {
            match current.get(key) {
                None => {
                    warn!(%key, "record deleted since it was selected");
                    return Err(EntityError::record_modified((*entity).clone(), None));
                }
                Some(row) => {
                    if let Some(attribute) = find_modification(definition, entity, row) {
                        warn!(%key, %attribute, "record modified since it was selected");
                        return Err(EntityError::record_modified((*entity).clone(), Some(row.clone())));
                    }
                }
            }
        }
        Ok(())
    }

    fn update_entities(&self, state: &mut State, entities: &[Entity]) -> EntityResult<Vec<Entity>> {
        if state.optimistic_locking {
            for (entity_type, group) in group_by_type(entities.iter(), |e| e.entity_type().clone()) {
                let definition = self.definition(&entity_type)?;
                self.lock_and_verify(state, definition, &group)?;
            }
        }
        for entity in entities {
            let definition = self.definition(entity.entity_type())?;
            let columns = update_columns(definition, entity);
            let where_condition = Self::key_condition(&entity.original_key())?;
            let where_clause = self.render(&where_condition, definition)?;
            let mut values: Vec<Value> = columns
                .iter()
                .map(|c| c.to_column(&entity.value(c.attribute())))
                .collect();
            values.extend(Self::bind(&where_condition, definition));
            let sql = queries::update_query(definition.table_name(), &columns, &where_clause);
            if state.execute(&sql, &values)? == 0 {
                return Err(EntityError::record_modified(entity.clone(), None));
            }
        }
        let keys: Vec<Key> = entities.iter().map(Entity::key).collect();
        self.select_in_order(state, &keys)
    }

    fn delete(&self, state: &mut State, definition: &EntityDefinition, condition: &Condition) -> EntityResult<usize> {
        let where_clause = self.render(condition, definition)?;
        let sql = queries::delete_query(definition.table_name(), &where_clause);
        state.execute(&sql, &Self::bind(condition, definition))
    }
}

fn put_generated_key(definition: &EntityDefinition, entity: &mut Entity, value: Value) -> EntityResult<()> {
    match definition.primary_key_columns().as_slice() {
        [column] => {
            entity.put(column.attribute(), column.from_column(value))?;
            Ok(())
        }
        columns => Err(EntityError::invalid_entity(format!(
            "generated keys need a single primary key column, {} has {}",
            definition.entity_type(),
            columns.len()
        ))),
    }
}

fn update_columns<'d>(definition: &'d EntityDefinition, entity: &Entity) -> Vec<&'d ColumnDefinition> {
    definition
        .columns()
        .iter()
        .filter(|c| c.is_updatable() && entity.is_modified_attribute(c.attribute()))
        .collect()
}

/// The first non-blob column whose value in `stale` (as originally
/// selected) differs from `current`.
fn find_modification<'d>(definition: &'d EntityDefinition, stale: &Entity, current: &Entity) -> Option<&'d Attribute> {
    definition
        .columns()
        .iter()
        .filter(|c| !c.value_type().is_blob())
        .filter(|c| stale.contains(c.attribute()) && current.contains(c.attribute()))
        .find(|c| {
            let value_type = c.value_type();
            value_type.coerce(stale.original(c.attribute())) != value_type.coerce(current.value(c.attribute()))
        })
        .map(ColumnDefinition::attribute)
}

/// Groups items by entity type, types in order of first appearance.
fn group_by_type<T>(items: impl IntoIterator<Item = T>, entity_type: impl Fn(&T) -> EntityType) -> Vec<(EntityType, Vec<T>)> {
    let mut groups: Vec<(EntityType, Vec<T>)> = Vec::new();
    for item in items {
        let item_type = entity_type(&item);
        match groups.iter_mut().find(|(t, _)| *t == item_type) {
            Some((_, group)) => group.push(item),
            None => groups.push((item_type, vec![item])),
        }
    }
    groups
}

impl EntityConnection for LocalEntityConnection {
    fn entities(&self) -> &Entities {
        &self.entities
    }

    fn is_connected(&self) -> bool {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.connection.is_valid()
    }

    fn begin_transaction(&self) -> EntityResult<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.transaction_open {
            return Err(EntityError::transaction_state("a transaction is already open"));
        }
        state.begin()?;
        state.transaction_open = true;
        debug!("transaction started");
        Ok(())
    }

    fn commit_transaction(&self) -> EntityResult<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.transaction_open {
            return Err(EntityError::transaction_state("no transaction is open"));
        }
        state.transaction_open = false;
        if let Err(error) = state.commit() {
            state.rollback_quietly();
            return Err(error);
        }
        debug!("transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self) -> EntityResult<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.transaction_open {
            return Err(EntityError::transaction_state("no transaction is open"));
        }
        state.transaction_open = false;
        state
            .connection
            .rollback()
            .map_err(|source| state.database_error(source, None, &[]))?;
        debug!("transaction rolled back");
        Ok(())
    }

    fn is_transaction_open(&self) -> bool {
        self.state.lock().borrow().transaction_open
    }

    fn optimistic_locking(&self) -> bool {
        self.state.lock().borrow().optimistic_locking
    }

    fn set_optimistic_locking(&self, enabled: bool) {
        self.state.lock().borrow_mut().optimistic_locking = enabled;
    }

    fn limit_fetch_depth(&self) -> bool {
        self.state.lock().borrow().limit_fetch_depth
    }

    fn set_limit_fetch_depth(&self, enabled: bool) {
        self.state.lock().borrow_mut().limit_fetch_depth = enabled;
    }

    fn insert(&self, entities: &[Entity]) -> EntityResult<Vec<Key>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        for entity in entities {
            self.writable_definition(entity.entity_type())?;
        }
        self.write(|state| self.insert_entities(state, entities))
    }

    fn insert_select(&self, entities: &[Entity]) -> EntityResult<Vec<Entity>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        for entity in entities {
            self.writable_definition(entity.entity_type())?;
        }
        self.write(|state| {
            let keys = self.insert_entities(state, entities)?;
            self.select_in_order(state, &keys)
        })
    }

    fn update(&self, entities: &[Entity]) -> EntityResult<Vec<Entity>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        for entity in entities {
            let definition = self.writable_definition(entity.entity_type())?;
            if update_columns(definition, entity).is_empty() {
                return Err(EntityError::invalid_entity(format!(
                    "{} has no modified updatable values",
                    entity.key()
                )));
            }
        }
        self.write(|state| self.update_entities(state, entities))
    }

    fn update_where(&self, update: &Update) -> EntityResult<usize> {
        let definition = self.writable_definition(update.condition().entity_type())?;
        let mut columns = Vec::with_capacity(update.values().len());
        let mut values = Vec::with_capacity(update.values().len());
        for (attribute, value) in update.values() {
            let column = definition.column(attribute)?;
            if !column.is_updatable() {
                return Err(DomainError::invalid_attribute(attribute, "not updatable").into());
            }
            if !column.value_type().accepts(value) {
                return Err(DomainError::invalid_value(
                    attribute,
                    format!("expected {}, got {}", column.value_type(), value.type_name()),
                )
                .into());
            }
            columns.push(column);
            values.push(column.to_column(value));
        }
        let where_clause = self.render(update.condition(), definition)?;
        values.extend(Self::bind(update.condition(), definition));
        let sql = queries::update_query(definition.table_name(), &columns, &where_clause);
        self.write(|state| state.execute(&sql, &values))
    }

    fn delete_where(&self, condition: &Condition) -> EntityResult<usize> {
        let definition = self.writable_definition(condition.entity_type())?;
        self.write(|state| self.delete(state, definition, condition))
    }

    fn delete_keys(&self, keys: &[Key]) -> EntityResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut deletes = Vec::new();
        for (entity_type, group) in group_by_type(keys.iter(), |key| key.entity_type().clone()) {
            let definition = self.writable_definition(&entity_type)?;
            if group.iter().any(|key| key.components().is_empty()) {
                return Err(EntityError::InvalidCondition(format!("{entity_type} has no primary key")));
            }
            let group: Vec<Key> = group.into_iter().cloned().collect();
            deletes.push((definition, condition::keys(&group)?));
        }
        self.write(|state| {
            let mut deleted = 0;
            for (definition, condition) in &deletes {
                deleted += self.delete(state, definition, condition)?;
            }
            Ok(deleted)
        })
    }

    fn select(&self, select: &Select) -> EntityResult<Vec<Entity>> {
        self.read(|state| self.select_entities(state, select))
    }

    fn select_keys(&self, keys: &[Key]) -> EntityResult<Vec<Entity>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.read(|state| {
            let mut entities = Vec::new();
            for (_, group) in group_by_type(keys.iter(), |key| key.entity_type().clone()) {
                let group: Vec<Key> = group.into_iter().cloned().collect();
                entities.extend(self.select_entities(state, &Select::where_(condition::keys(&group)?))?);
            }
            Ok(entities)
        })
    }

    fn select_by_key(&self, key: &Key) -> EntityResult<Entity> {
        self.select_single(&Select::where_(Self::key_condition(key)?))
    }

    fn row_count(&self, condition: &Condition) -> EntityResult<usize> {
        let definition = self.definition(condition.entity_type())?;
        let where_clause = self.render(condition, definition)?;
        let values = Self::bind(condition, definition);
        self.read(|state| {
            let sql = queries::count_query(definition, &where_clause, state.connection.database());
            let count = state.query_value(&sql, &values)?;
            count
                .as_i64()
                .and_then(|count| usize::try_from(count).ok())
                .ok_or_else(|| {
                    state.database_error(DbError::NoRows(format!("row count query returned {count}")), Some(&sql), &values)
                })
        })
    }

    fn select_values(&self, attribute: &Attribute, condition: &Condition) -> EntityResult<Vec<Value>> {
        let definition = self.definition(condition.entity_type())?;
        if definition.select_query().is_some() {
            return Err(EntityError::unsupported(format!(
                "select_values is not supported for {}, which has a custom select query",
                definition.entity_type()
            )));
        }
        let column_definition = definition.column(attribute)?;
        let not_null = column(attribute).is_not_null();
        let condition = if condition.is_all() {
            not_null
        } else {
            condition::and([condition.clone(), not_null])?
        };
        let where_clause = self.render(&condition, definition)?;
        let values = Self::bind(&condition, definition);
        let expression = column_definition.column_expression();
        self.read(|state| {
            let sql = SelectStatement::new(definition, format!("distinct {expression}"))
                .where_clause(where_clause)
                .order_by(Some(expression.to_string()))
                .ungrouped()
                .to_sql(state.connection.database());
            let rows = state.query(&sql, &values, None)?;
            Ok(rows
                .into_iter()
                .filter_map(|row| row.into_iter().next())
                .map(|value| column_definition.from_column(value))
                .collect())
        })
    }

    fn dependencies(&self, entities: &[Entity]) -> EntityResult<HashMap<EntityType, Vec<Entity>>> {
        let mut dependencies: HashMap<EntityType, Vec<Entity>> = HashMap::new();
        if entities.is_empty() {
            return Ok(dependencies);
        }
        self.read(|state| {
            for (entity_type, group) in group_by_type(entities.iter(), |e| e.entity_type().clone()) {
                for (definition, foreign_key) in self.entities.referencing(&entity_type) {
                    let condition =
                        condition::foreign_key(foreign_key.foreign_key()).in_entities(group.iter().copied());
                    let found = self.select_entities(state, &Select::where_(condition))?;
                    if found.is_empty() {
                        continue;
                    }
                    let entry = dependencies.entry(definition.entity_type().clone()).or_default();
                    for entity in found {
                        if !entry.contains(&entity) {
                            entry.push(entity);
                        }
                    }
                }
            }
            Ok(dependencies)
        })
    }

    fn read_blob(&self, key: &Key, attribute: &Attribute) -> EntityResult<Option<Vec<u8>>> {
        let definition = self.definition(key.entity_type())?;
        let column_definition = blob_column(definition, attribute)?;
        let condition = Self::key_condition(key)?;
        let sql = queries::column_query(
            definition.table_name(),
            column_definition,
            &self.render(&condition, definition)?,
        );
        let values = Self::bind(&condition, definition);
        let rows = self.read(|state| state.query(&sql, &values, Some(1)))?;
        let value = rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or(EntityError::RecordNotFound)?;
        Ok(value.as_bytes().map(<[u8]>::to_vec))
    }

    fn write_blob(&self, key: &Key, attribute: &Attribute, data: &[u8]) -> EntityResult<()> {
        let definition = self.writable_definition(key.entity_type())?;
        let column_definition = blob_column(definition, attribute)?;
        let condition = Self::key_condition(key)?;
        let sql = queries::update_query(
            definition.table_name(),
            &[column_definition],
            &self.render(&condition, definition)?,
        );
        let mut values = vec![Value::Blob(data.to_vec())];
        values.extend(Self::bind(&condition, definition));
        let updated = self.write(|state| state.execute(&sql, &values))?;
        if updated == 0 {
            return Err(EntityError::RecordNotFound);
        }
        Ok(())
    }

    fn execute_function(&self, id: &str, arguments: &[Value]) -> EntityResult<Value> {
        let function = self
            .functions
            .get_function(id)
            .ok_or_else(|| EntityError::FunctionNotFound(id.to_string()))?;
        let _guard = self.state.lock();
        debug!(function = id, arguments = arguments.len(), "execute function");
        function.execute(self, arguments)
    }

    fn execute_procedure(&self, id: &str, arguments: &[Value]) -> EntityResult<()> {
        let procedure = self
            .functions
            .get_procedure(id)
            .ok_or_else(|| EntityError::FunctionNotFound(id.to_string()))?;
        let _guard = self.state.lock();
        debug!(procedure = id, arguments = arguments.len(), "execute procedure");
        procedure.execute(self, arguments)
    }
}

fn blob_column<'d>(definition: &'d EntityDefinition, attribute: &Attribute) -> EntityResult<&'d ColumnDefinition> {
    let column = definition.column(attribute)?;
    if column.value_type().is_blob() {
        Ok(column)
    } else {
        Err(EntityError::InvalidAttributeType {
            attribute: attribute.to_string(),
            expected: "blob".to_string(),
            actual: column.value_type().to_string(),
        })
    }
}

impl fmt::Debug for LocalEntityConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEntityConnection")
            .field("domain", &self.entities.domain_name())
            .field("config", &self.config)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl Drop for LocalEntityConnection {
    fn drop(&mut self) {
        let state = self.state.get_mut().get_mut();
        if state.transaction_open {
            warn!("entity connection dropped with an open transaction, rolling back");
            state.transaction_open = false;
            state.rollback_quietly();
        }
    }
}

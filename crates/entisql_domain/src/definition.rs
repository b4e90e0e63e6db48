//! Entity definitions.
//!
//! An [`EntityDefinition`] describes how one entity type maps onto a table:
//! its columns, foreign keys, derived attributes, key generation and the
//! query used to select it.

use crate::attribute::{Attribute, EntityType, ForeignKey};
use crate::condition::OrderBy;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::key_generator::{DefaultKeyGenerator, KeyGenerator};
use crate::value_type::{ColumnConverter, ValueType};
use entisql_db::Value;
use std::fmt;
use std::sync::Arc;

/// Default depth to which a foreign key is resolved on select.
pub const DEFAULT_FETCH_DEPTH: usize = 1;

/// A column backed attribute.
#[derive(Clone)]
pub struct ColumnDefinition {
    attribute: Attribute,
    value_type: ValueType,
    expression: String,
    primary_key_index: Option<usize>,
    insertable: bool,
    updatable: bool,
    nullable: bool,
    selected: bool,
    grouping: bool,
    aggregate: bool,
    converter: Option<Arc<dyn ColumnConverter>>,
}

impl ColumnDefinition {
    /// Creates a column named after its attribute.
    ///
    /// Blob columns are not selected by default; read them with a blob
    /// read, or mark them [`eagerly_loaded`](Self::eagerly_loaded).
    #[must_use]
    pub fn new(attribute: Attribute, value_type: ValueType) -> Self {
        Self {
            expression: attribute.name().to_string(),
            attribute,
            value_type,
            primary_key_index: None,
            insertable: true,
            updatable: true,
            nullable: true,
            selected: !value_type.is_blob(),
            grouping: false,
            aggregate: false,
            converter: None,
        }
    }

    /// Creates the first (or only) primary key column.
    #[must_use]
    pub fn primary_key(attribute: Attribute, value_type: ValueType) -> Self {
        Self::new(attribute, value_type).primary_key_index(0)
    }

    /// Sets the position of this column in a composite primary key.
    #[must_use]
    pub fn primary_key_index(mut self, index: usize) -> Self {
        self.primary_key_index = Some(index);
        self.nullable = false;
        self
    }

    /// Sets the column expression, when it differs from the attribute name.
    #[must_use]
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Excludes the column from inserts and updates.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.insertable = false;
        self.updatable = false;
        self
    }

    /// Sets whether the column is included in inserts.
    #[must_use]
    pub fn insertable(mut self, insertable: bool) -> Self {
        self.insertable = insertable;
        self
    }

    /// Sets whether the column is included in updates.
    #[must_use]
    pub fn updatable(mut self, updatable: bool) -> Self {
        self.updatable = updatable;
        self
    }

    /// Sets whether the column accepts null.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Includes a blob column in regular selects.
    #[must_use]
    pub fn eagerly_loaded(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Marks the column as part of the `group by` clause.
    #[must_use]
    pub fn grouping(mut self) -> Self {
        self.grouping = true;
        self
    }

    /// Marks the column as an aggregate expression, never written.
    #[must_use]
    pub fn aggregate(mut self) -> Self {
        self.aggregate = true;
        self.read_only()
    }

    /// Sets the converter between entity and column values.
    #[must_use]
    pub fn converter(mut self, converter: impl ColumnConverter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Returns the attribute.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the value type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the SQL column expression.
    #[must_use]
    pub fn column_expression(&self) -> &str {
        &self.expression
    }

    /// Returns the primary key index, if this is a primary key column.
    #[must_use]
    pub const fn key_index(&self) -> Option<usize> {
        self.primary_key_index
    }

    /// Returns true for primary key columns.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key_index.is_some()
    }

    /// Returns true if the column is included in inserts.
    #[must_use]
    pub const fn is_insertable(&self) -> bool {
        self.insertable
    }

    /// Returns true if the column is included in updates.
    #[must_use]
    pub const fn is_updatable(&self) -> bool {
        self.updatable
    }

    /// Returns true if the column is neither inserted nor updated.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        !self.insertable && !self.updatable
    }

    /// Returns true if the column accepts null.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns true if the column is part of regular selects.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns true if the column is a `group by` column.
    #[must_use]
    pub const fn is_grouping(&self) -> bool {
        self.grouping
    }

    /// Returns true for aggregate columns.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    /// Converts an entity value to the value bound for this column.
    #[must_use]
    pub fn to_column(&self, value: &Value) -> Value {
        match &self.converter {
            Some(converter) => converter.to_column(value),
            None => value.clone(),
        }
    }

    /// Converts a result column value to the entity value.
    #[must_use]
    pub fn from_column(&self, value: Value) -> Value {
        match &self.converter {
            Some(converter) => converter.from_column(value),
            None => self.value_type.coerce(value),
        }
    }
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("attribute", &self.attribute)
            .field("value_type", &self.value_type)
            .field("expression", &self.expression)
            .field("primary_key_index", &self.primary_key_index)
            .finish_non_exhaustive()
    }
}

/// A foreign key attribute.
#[derive(Debug, Clone)]
pub struct ForeignKeyDefinition {
    foreign_key: ForeignKey,
    fetch_depth: usize,
    soft: bool,
}

impl ForeignKeyDefinition {
    /// Creates a foreign key definition resolved to the default depth.
    #[must_use]
    pub const fn new(foreign_key: ForeignKey) -> Self {
        Self {
            foreign_key,
            fetch_depth: DEFAULT_FETCH_DEPTH,
            soft: false,
        }
    }

    /// Sets how many levels of references are resolved on select.
    ///
    /// Zero leaves the referenced entity as a key-only placeholder.
    #[must_use]
    pub const fn fetch_depth(mut self, depth: usize) -> Self {
        self.fetch_depth = depth;
        self
    }

    /// Marks the key as soft: not backed by a database constraint and
    /// ignored when looking up dependencies.
    #[must_use]
    pub const fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    /// Returns the foreign key.
    #[must_use]
    pub const fn foreign_key(&self) -> &ForeignKey {
        &self.foreign_key
    }

    /// Returns the attribute holding the referenced entity.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        self.foreign_key.attribute()
    }

    /// Returns the declared fetch depth.
    #[must_use]
    pub const fn default_fetch_depth(&self) -> usize {
        self.fetch_depth
    }

    /// Returns true for soft references.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        self.soft
    }
}

/// Computes a derived value from an entity.
pub type DerivedProvider = Arc<dyn Fn(&Entity) -> Value + Send + Sync>;

/// An attribute computed from other attributes, never stored.
#[derive(Clone)]
pub struct DerivedDefinition {
    attribute: Attribute,
    value_type: ValueType,
    sources: Vec<Attribute>,
    provider: DerivedProvider,
}

impl DerivedDefinition {
    /// Creates a derived attribute computed by `provider` from `sources`.
    pub fn new<F>(attribute: Attribute, value_type: ValueType, sources: Vec<Attribute>, provider: F) -> Self
    where
        F: Fn(&Entity) -> Value + Send + Sync + 'static,
    {
        Self {
            attribute,
            value_type,
            sources,
            provider: Arc::new(provider),
        }
    }

    /// Returns the attribute.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the value type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the attributes the value is computed from.
    #[must_use]
    pub fn sources(&self) -> &[Attribute] {
        &self.sources
    }

    /// Computes the value for `entity`.
    #[must_use]
    pub fn compute(&self, entity: &Entity) -> Value {
        (self.provider)(entity)
    }
}

impl fmt::Debug for DerivedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedDefinition")
            .field("attribute", &self.attribute)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

/// A custom query selecting an entity type in place of its table.
///
/// The query must select the entity's selected columns in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    query: String,
    contains_where_clause: bool,
}

impl SelectQuery {
    /// Creates a select query; `contains_where_clause` tells whether further
    /// conditions are appended with `and` rather than `where`.
    pub fn new(query: impl Into<String>, contains_where_clause: bool) -> Self {
        Self {
            query: query.into(),
            contains_where_clause,
        }
    }

    /// Returns the query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns true if the query already has a `where` clause.
    #[must_use]
    pub const fn contains_where_clause(&self) -> bool {
        self.contains_where_clause
    }
}

/// Describes one entity type.
#[derive(Debug)]
pub struct EntityDefinition {
    entity_type: EntityType,
    table_name: String,
    select_table_name: Option<String>,
    select_query: Option<SelectQuery>,
    having_clause: Option<String>,
    order_by: Option<OrderBy>,
    read_only: bool,
    insert_hint: Option<String>,
    key_generator: Arc<dyn KeyGenerator>,
    columns: Vec<ColumnDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
    derived: Vec<DerivedDefinition>,
}

impl EntityDefinition {
    /// Starts a definition for `entity_type` stored in `table_name`.
    pub fn builder(entity_type: EntityType, table_name: impl Into<String>) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            definition: Self {
                entity_type,
                table_name: table_name.into(),
                select_table_name: None,
                select_query: None,
                having_clause: None,
                order_by: None,
                read_only: false,
                insert_hint: None,
                key_generator: Arc::new(DefaultKeyGenerator),
                columns: Vec::new(),
                foreign_keys: Vec::new(),
                derived: Vec::new(),
            },
        }
    }

    /// Returns the entity type.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Returns the table written to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the table or view selected from.
    #[must_use]
    pub fn select_table_name(&self) -> &str {
        self.select_table_name.as_deref().unwrap_or(&self.table_name)
    }

    /// Returns the custom select query, if any.
    #[must_use]
    pub const fn select_query(&self) -> Option<&SelectQuery> {
        self.select_query.as_ref()
    }

    /// Returns the `having` clause for grouped entity types.
    #[must_use]
    pub fn having_clause(&self) -> Option<&str> {
        self.having_clause.as_deref()
    }

    /// Returns the default ordering.
    #[must_use]
    pub const fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Returns true if entities of this type may not be written.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the optimizer hint placed after `insert`, if any.
    #[must_use]
    pub fn insert_hint(&self) -> Option<&str> {
        self.insert_hint.as_deref()
    }

    /// Returns the key generator.
    #[must_use]
    pub fn key_generator(&self) -> &dyn KeyGenerator {
        self.key_generator.as_ref()
    }

    /// Returns all column definitions in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Returns the column definition for `attribute`, if it is a column.
    #[must_use]
    pub fn find_column(&self, attribute: &Attribute) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.attribute() == attribute)
    }

    /// Returns the column definition for `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAttribute`] if `attribute` is not a
    /// column of this entity type.
    pub fn column(&self, attribute: &Attribute) -> DomainResult<&ColumnDefinition> {
        self.find_column(attribute).ok_or_else(|| {
            let message = if self.contains(attribute) {
                "not a column attribute"
            } else {
                "not found in entity definition"
            };
            DomainError::invalid_attribute(attribute, message)
        })
    }

    /// Returns the primary key columns ordered by key index.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&ColumnDefinition> {
        let mut columns: Vec<_> = self.columns.iter().filter(|c| c.is_primary_key()).collect();
        columns.sort_by_key(|c| c.key_index());
        columns
    }

    /// Returns true if any column is part of the primary key.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(ColumnDefinition::is_primary_key)
    }

    /// Returns the columns included in regular selects, in declaration order.
    #[must_use]
    pub fn selected_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.is_selected()).collect()
    }

    /// Returns the `group by` clause, if any column is a grouping column.
    #[must_use]
    pub fn group_by_clause(&self) -> Option<String> {
        let grouping: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.is_grouping())
            .map(ColumnDefinition::column_expression)
            .collect();
        (!grouping.is_empty()).then(|| grouping.join(", "))
    }

    /// Returns the foreign key definitions.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKeyDefinition] {
        &self.foreign_keys
    }

    /// Returns the foreign key definition whose attribute is `attribute`.
    #[must_use]
    pub fn foreign_key(&self, attribute: &Attribute) -> Option<&ForeignKeyDefinition> {
        self.foreign_keys.iter().find(|fk| fk.attribute() == attribute)
    }

    /// Returns the foreign keys `column` takes part in.
    pub fn foreign_keys_with_column<'a>(
        &'a self,
        column: &'a Attribute,
    ) -> impl Iterator<Item = &'a ForeignKeyDefinition> + 'a {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.foreign_key().reference(column).is_some())
    }

    /// Returns the derived attribute definitions.
    #[must_use]
    pub fn derived_attributes(&self) -> &[DerivedDefinition] {
        &self.derived
    }

    /// Returns the derived definition for `attribute`, if it is derived.
    #[must_use]
    pub fn derived(&self, attribute: &Attribute) -> Option<&DerivedDefinition> {
        self.derived.iter().find(|d| d.attribute() == attribute)
    }

    /// Returns true if `attribute` is defined for this entity type.
    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.find_column(attribute).is_some()
            || self.foreign_key(attribute).is_some()
            || self.derived(attribute).is_some()
    }

    /// Returns every attribute in declaration order: columns, foreign keys,
    /// then derived attributes.
    #[must_use]
    pub fn attributes(&self) -> Vec<&Attribute> {
        self.columns
            .iter()
            .map(ColumnDefinition::attribute)
            .chain(self.foreign_keys.iter().map(ForeignKeyDefinition::attribute))
            .chain(self.derived.iter().map(DerivedDefinition::attribute))
            .collect()
    }
}

/// Builds an [`EntityDefinition`].
#[derive(Debug)]
pub struct EntityDefinitionBuilder {
    definition: EntityDefinition,
}

impl EntityDefinitionBuilder {
    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.definition.columns.push(column);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyDefinition) -> Self {
        self.definition.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a derived attribute.
    #[must_use]
    pub fn derived(mut self, derived: DerivedDefinition) -> Self {
        self.definition.derived.push(derived);
        self
    }

    /// Selects from a table or view other than the one written to.
    #[must_use]
    pub fn select_table_name(mut self, name: impl Into<String>) -> Self {
        self.definition.select_table_name = Some(name.into());
        self
    }

    /// Selects with a custom query.
    #[must_use]
    pub fn select_query(mut self, query: SelectQuery) -> Self {
        self.definition.select_query = Some(query);
        self
    }

    /// Sets the `having` clause.
    #[must_use]
    pub fn having_clause(mut self, having: impl Into<String>) -> Self {
        self.definition.having_clause = Some(having.into());
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.definition.order_by = Some(order_by);
        self
    }

    /// Marks the entity type read-only.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.definition.read_only = read_only;
        self
    }

    /// Sets an optimizer hint placed after `insert`.
    #[must_use]
    pub fn insert_hint(mut self, hint: impl Into<String>) -> Self {
        self.definition.insert_hint = Some(hint.into());
        self
    }

    /// Sets the key generator.
    #[must_use]
    pub fn key_generator(mut self, generator: impl KeyGenerator + 'static) -> Self {
        self.definition.key_generator = Arc::new(generator);
        self
    }

    /// Finishes the definition. Consistency is checked when it is added to
    /// an [`crate::Entities`] registry.
    #[must_use]
    pub fn build(self) -> EntityDefinition {
        self.definition
    }
}

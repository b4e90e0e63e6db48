//! Select and update specifications built around a condition.

use super::Condition;
use crate::attribute::{Attribute, EntityType};
use crate::definition::EntityDefinition;
use crate::error::{DomainError, DomainResult};
use entisql_db::Value;
use serde::{Deserialize, Serialize};

/// One `order by` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderByColumn {
    /// The column attribute to order by.
    pub attribute: Attribute,
    /// False for descending order.
    pub ascending: bool,
}

/// An ordered list of `order by` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    columns: Vec<OrderByColumn>,
}

impl OrderBy {
    /// Orders ascending by `attributes`.
    #[must_use]
    pub fn ascending(attributes: &[Attribute]) -> Self {
        Self::default().then_ascending(attributes)
    }

    /// Orders descending by `attributes`.
    #[must_use]
    pub fn descending(attributes: &[Attribute]) -> Self {
        Self::default().then_descending(attributes)
    }

    /// Appends ascending entries.
    #[must_use]
    pub fn then_ascending(self, attributes: &[Attribute]) -> Self {
        self.push(attributes, true)
    }

    /// Appends descending entries.
    #[must_use]
    pub fn then_descending(self, attributes: &[Attribute]) -> Self {
        self.push(attributes, false)
    }

    fn push(mut self, attributes: &[Attribute], ascending: bool) -> Self {
        self.columns.extend(attributes.iter().map(|attribute| OrderByColumn {
            attribute: attribute.clone(),
            ascending,
        }));
        self
    }

    /// Returns the entries.
    #[must_use]
    pub fn columns(&self) -> &[OrderByColumn] {
        &self.columns
    }

    /// Renders `col1, col2 desc`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAttribute`] if an entry is not a column
    /// of `definition`.
    pub fn to_sql(&self, definition: &EntityDefinition) -> DomainResult<String> {
        let mut parts = Vec::with_capacity(self.columns.len());
        for entry in &self.columns {
            let expression = definition.column(&entry.attribute)?.column_expression();
            if entry.ascending {
                parts.push(expression.to_string());
            } else {
                parts.push(format!("{expression} desc"));
            }
        }
        Ok(parts.join(", "))
    }
}

/// What to select: a condition plus ordering, paging and fetch options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    condition: Condition,
    order_by: Option<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
    fetch_count: Option<usize>,
    fetch_depth: Option<usize>,
    foreign_key_fetch_depths: Vec<(Attribute, usize)>,
    attributes: Option<Vec<Attribute>>,
    for_update: bool,
}

impl Select {
    /// Selects the rows matching `condition`.
    #[must_use]
    pub fn where_(condition: Condition) -> Self {
        Self {
            condition,
            order_by: None,
            limit: None,
            offset: None,
            fetch_count: None,
            fetch_depth: None,
            foreign_key_fetch_depths: Vec::new(),
            attributes: None,
            for_update: false,
        }
    }

    /// Selects every row of `entity_type`.
    #[must_use]
    pub fn all(entity_type: EntityType) -> Self {
        Self::where_(Condition::All(entity_type))
    }

    /// Overrides the definition's default ordering.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Limits the number of rows the query returns.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips rows before the first returned one.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Stops packing after `count` rows.
    #[must_use]
    pub const fn fetch_count(mut self, count: usize) -> Self {
        self.fetch_count = Some(count);
        self
    }

    /// Default depth to which foreign keys are resolved for this select.
    #[must_use]
    pub const fn fetch_depth(mut self, depth: usize) -> Self {
        self.fetch_depth = Some(depth);
        self
    }

    /// Resolution depth for one foreign key, identified by its attribute.
    #[must_use]
    pub fn fetch_depth_for(mut self, foreign_key: &Attribute, depth: usize) -> Self {
        self.foreign_key_fetch_depths.retain(|(attribute, _)| attribute != foreign_key);
        self.foreign_key_fetch_depths.push((foreign_key.clone(), depth));
        self
    }

    /// Selects only these column attributes; primary key columns are always
    /// selected.
    #[must_use]
    pub fn attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Locks the selected rows until the transaction ends, where the
    /// database supports it. Foreign keys are not resolved.
    #[must_use]
    pub const fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Returns the condition.
    #[must_use]
    pub const fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Returns the entity type selected.
    #[must_use]
    pub fn entity_type(&self) -> &EntityType {
        self.condition.entity_type()
    }

    /// Returns the explicit ordering, if any.
    #[must_use]
    pub const fn get_order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Returns the row limit.
    #[must_use]
    pub const fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the row offset.
    #[must_use]
    pub const fn get_offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns the packing cap.
    #[must_use]
    pub const fn get_fetch_count(&self) -> Option<usize> {
        self.fetch_count
    }

    /// Returns the select wide fetch depth.
    #[must_use]
    pub const fn get_fetch_depth(&self) -> Option<usize> {
        self.fetch_depth
    }

    /// Returns the fetch depth override for `foreign_key`.
    #[must_use]
    pub fn foreign_key_fetch_depth(&self, foreign_key: &Attribute) -> Option<usize> {
        self.foreign_key_fetch_depths
            .iter()
            .find(|(attribute, _)| attribute == foreign_key)
            .map(|(_, depth)| *depth)
    }

    /// Returns the selected attribute subset, if any.
    #[must_use]
    pub fn get_attributes(&self) -> Option<&[Attribute]> {
        self.attributes.as_deref()
    }

    /// Returns true for `select ... for update`.
    #[must_use]
    pub const fn is_for_update(&self) -> bool {
        self.for_update
    }
}

impl From<Condition> for Select {
    fn from(condition: Condition) -> Self {
        Self::where_(condition)
    }
}

/// A bulk update: new column values for every row matching a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    condition: Condition,
    values: Vec<(Attribute, Value)>,
}

impl Update {
    /// Starts an update of the rows matching `condition`.
    #[must_use]
    pub fn where_(condition: Condition) -> UpdateBuilder {
        UpdateBuilder {
            condition,
            values: Vec::new(),
            error: None,
        }
    }

    /// Returns the condition.
    #[must_use]
    pub const fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Returns the new values in `set` order.
    #[must_use]
    pub fn values(&self) -> &[(Attribute, Value)] {
        &self.values
    }
}

/// Builds an [`Update`]; errors surface from [`UpdateBuilder::build`].
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    condition: Condition,
    values: Vec<(Attribute, Value)>,
    error: Option<DomainError>,
}

impl UpdateBuilder {
    /// Sets `attribute` to `value` on every matching row.
    #[must_use]
    pub fn set(mut self, attribute: &Attribute, value: impl Into<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if attribute.entity_type() != self.condition.entity_type() {
            self.error = Some(DomainError::invalid_attribute(
                attribute,
                format!("does not belong to {}", self.condition.entity_type()),
            ));
        } else if self.values.iter().any(|(existing, _)| existing == attribute) {
            self.error = Some(DomainError::invalid_condition(format!(
                "update sets {attribute} more than once"
            )));
        } else {
            self.values.push((attribute.clone(), value.into()));
        }
        self
    }

    /// Finishes the update.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded by [`set`](Self::set), or
    /// [`DomainError::InvalidCondition`] if no values were set.
    pub fn build(self) -> DomainResult<Update> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.values.is_empty() {
            return Err(DomainError::invalid_condition("an update requires at least one value"));
        }
        Ok(Update {
            condition: self.condition,
            values: self.values,
        })
    }
}

//! The condition algebra.
//!
//! Conditions are immutable values describing a `where` clause. They carry
//! no connection and know nothing about SQL until rendered against an
//! [`EntityDefinition`] with [`Condition::to_sql`], which produces the
//! clause text with `?` placeholders; [`Condition::values`] yields the
//! parameters in placeholder order.
//!
//! ```rust
//! use entisql_domain::condition::{and, column};
//! use entisql_domain::{Attribute, EntityType};
//!
//! const EMP: EntityType = EntityType::new("emp");
//! const NAME: Attribute = Attribute::new(EMP, "ename");
//! const SAL: Attribute = Attribute::new(EMP, "sal");
//!
//! let condition = and([
//!     column(&NAME).like("S%"),
//!     column(&SAL).between(1000, 2000).unwrap(),
//! ])
//! .unwrap();
//! assert_eq!(condition.values().len(), 3);
//! ```

mod builder;
mod operator;
mod render;
mod select;

pub use builder::{column, foreign_key, ColumnConditionBuilder, ForeignKeyConditionBuilder};
pub use operator::Operator;
pub use select::{OrderBy, OrderByColumn, Select, Update, UpdateBuilder};

use crate::attribute::{Attribute, EntityType};
use crate::definition::EntityDefinition;
use crate::error::{DomainError, DomainResult};
use crate::key::Key;
use entisql_db::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of values per `in (...)` list before it is split.
pub const DEFAULT_IN_CLAUSE_LIMIT: usize = 100;

/// How the operands of a combination are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conjunction {
    /// All operands hold.
    And,
    /// At least one operand holds.
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// A `where` clause over one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// No restriction.
    All(EntityType),
    /// A predicate over one column.
    Column(ColumnCondition),
    /// Operands joined by `and` or `or`.
    Combination(Combination),
    /// A verbatim SQL fragment with bound values.
    Custom(CustomCondition),
}

/// A predicate over a single column attribute.
///
/// Deserialization goes through [`ColumnCondition::new`], so a received
/// condition holds the same value counts as a constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColumnConditionFields")]
pub struct ColumnCondition {
    attribute: Attribute,
    operator: Operator,
    values: Vec<Value>,
    case_sensitive: bool,
}

impl ColumnCondition {
    /// Creates a column condition.
    ///
    /// A single null value for [`Operator::Equal`] or [`Operator::NotEqual`]
    /// becomes a null check.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCondition`] if the values do not suit
    /// the operator.
    pub fn new(
        attribute: Attribute,
        operator: Operator,
        mut values: Vec<Value>,
        case_sensitive: bool,
    ) -> DomainResult<Self> {
        if matches!(operator, Operator::Equal | Operator::NotEqual)
            && values.len() == 1
            && values[0].is_null()
        {
            values.clear();
        }
        operator.validate(&values)?;
        Ok(Self {
            attribute,
            operator,
            values,
            case_sensitive,
        })
    }

    /// Returns the attribute.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operand values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns false for the `ignore_case` variants.
    #[must_use]
    pub const fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

#[derive(Deserialize)]
struct ColumnConditionFields {
    attribute: Attribute,
    operator: Operator,
    values: Vec<Value>,
    case_sensitive: bool,
}

impl TryFrom<ColumnConditionFields> for ColumnCondition {
    type Error = DomainError;

    fn try_from(fields: ColumnConditionFields) -> DomainResult<Self> {
        Self::new(fields.attribute, fields.operator, fields.values, fields.case_sensitive)
    }
}

/// Conditions joined by one conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CombinationFields")]
pub struct Combination {
    entity_type: EntityType,
    conjunction: Conjunction,
    conditions: Vec<Condition>,
}

#[derive(Deserialize)]
struct CombinationFields {
    entity_type: EntityType,
    conjunction: Conjunction,
    conditions: Vec<Condition>,
}

impl TryFrom<CombinationFields> for Combination {
    type Error = DomainError;

    fn try_from(fields: CombinationFields) -> DomainResult<Self> {
        let combination = Self::new(fields.conjunction, fields.conditions)?;
        if combination.entity_type != fields.entity_type {
            return Err(DomainError::invalid_condition(format!(
                "combination for {} holds conditions for {}",
                fields.entity_type, combination.entity_type
            )));
        }
        Ok(combination)
    }
}

impl Combination {
    /// Joins at least two conditions of one entity type.
    fn new(conjunction: Conjunction, conditions: Vec<Condition>) -> DomainResult<Self> {
        if conditions.len() < 2 {
            return Err(DomainError::invalid_condition(format!(
                "a combination needs at least two conditions, got {}",
                conditions.len()
            )));
        }
        let entity_type = conditions[0].entity_type().clone();
        if let Some(other) = conditions.iter().find(|c| c.entity_type() != &entity_type) {
            return Err(DomainError::invalid_condition(format!(
                "combined conditions must share an entity type, found {entity_type} and {}",
                other.entity_type()
            )));
        }
        Ok(Self {
            entity_type,
            conjunction,
            conditions,
        })
    }

    /// Returns the conjunction.
    #[must_use]
    pub const fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    /// Returns the operands.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// A verbatim SQL fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CustomConditionFields")]
pub struct CustomCondition {
    entity_type: EntityType,
    sql: String,
    attributes: Vec<Attribute>,
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct CustomConditionFields {
    entity_type: EntityType,
    sql: String,
    attributes: Vec<Attribute>,
    values: Vec<Value>,
}

impl TryFrom<CustomConditionFields> for CustomCondition {
    type Error = DomainError;

    fn try_from(fields: CustomConditionFields) -> DomainResult<Self> {
        if fields.attributes.len() != fields.values.len() {
            return Err(DomainError::invalid_condition(format!(
                "custom condition has {} attributes and {} values",
                fields.attributes.len(),
                fields.values.len()
            )));
        }
        Ok(Self {
            entity_type: fields.entity_type,
            sql: fields.sql,
            attributes: fields.attributes,
            values: fields.values,
        })
    }
}

impl CustomCondition {
    /// Returns the SQL fragment.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Condition {
    /// Returns the entity type the condition applies to.
    #[must_use]
    pub fn entity_type(&self) -> &EntityType {
        match self {
            Self::All(entity_type) => entity_type,
            Self::Column(condition) => condition.attribute.entity_type(),
            Self::Combination(combination) => &combination.entity_type,
            Self::Custom(custom) => &custom.entity_type,
        }
    }

    /// Returns the parameter values in placeholder order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        self.collect(&mut values, &mut Vec::new());
        values
    }

    /// Returns the attribute each parameter value binds to, in placeholder
    /// order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        self.collect(&mut Vec::new(), &mut attributes);
        attributes
    }

    fn collect(&self, values: &mut Vec<Value>, attributes: &mut Vec<Attribute>) {
        match self {
            Self::All(_) => {}
            Self::Column(condition) => {
                values.extend(condition.values.iter().cloned());
                attributes.extend(
                    std::iter::repeat(condition.attribute.clone()).take(condition.values.len()),
                );
            }
            Self::Combination(combination) => {
                for condition in &combination.conditions {
                    condition.collect(values, attributes);
                }
            }
            Self::Custom(custom) => {
                values.extend(custom.values.iter().cloned());
                attributes.extend(custom.attributes.iter().cloned());
            }
        }
    }

    /// Renders the `where` clause text, without the `where` keyword, using
    /// the default `in` list limit.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCondition`] if the condition is for
    /// another entity type, or [`DomainError::InvalidAttribute`] if it
    /// references an attribute that is not a column of `definition`.
    pub fn to_sql(&self, definition: &EntityDefinition) -> DomainResult<String> {
        self.to_sql_with_limit(definition, DEFAULT_IN_CLAUSE_LIMIT)
    }

    /// Renders the `where` clause text, splitting `in` lists longer than
    /// `in_clause_limit` into several lists.
    ///
    /// # Errors
    ///
    /// See [`Condition::to_sql`].
    pub fn to_sql_with_limit(
        &self,
        definition: &EntityDefinition,
        in_clause_limit: usize,
    ) -> DomainResult<String> {
        if self.entity_type() != definition.entity_type() {
            return Err(DomainError::invalid_condition(format!(
                "condition for {} rendered against {}",
                self.entity_type(),
                definition.entity_type()
            )));
        }
        render::render(self, definition, in_clause_limit.max(1))
    }

    /// Returns true for [`Condition::All`].
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All(_))
    }

    fn combination(entity_type: EntityType, conjunction: Conjunction, conditions: Vec<Self>) -> Self {
        Self::Combination(Combination {
            entity_type,
            conjunction,
            conditions,
        })
    }
}

/// A condition matching every row of `entity_type`.
#[must_use]
pub fn all(entity_type: EntityType) -> Condition {
    Condition::All(entity_type)
}

/// Joins conditions with `and`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidCondition`] with fewer than two operands or
/// operands of different entity types.
pub fn and(conditions: impl IntoIterator<Item = Condition>) -> DomainResult<Condition> {
    combine(Conjunction::And, conditions.into_iter().collect())
}

/// Joins conditions with `or`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidCondition`] with fewer than two operands or
/// operands of different entity types.
pub fn or(conditions: impl IntoIterator<Item = Condition>) -> DomainResult<Condition> {
    combine(Conjunction::Or, conditions.into_iter().collect())
}

fn combine(conjunction: Conjunction, conditions: Vec<Condition>) -> DomainResult<Condition> {
    Combination::new(conjunction, conditions).map(Condition::Combination)
}

/// A condition matching the row identified by `key`.
///
/// Single column keys render as `col = ?`; composite keys as one equality
/// per component joined with `and`. Null components render as null checks.
#[must_use]
pub fn key(key: &Key) -> Condition {
    let mut conditions: Vec<Condition> = key
        .components()
        .iter()
        .map(|(attribute, value)| column(attribute).equal_to(value.clone()))
        .collect();
    if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        Condition::combination(key.entity_type().clone(), Conjunction::And, conditions)
    }
}

/// A condition matching the rows identified by `keys`.
///
/// Single column keys render as `col in (?, ...)`; composite keys as one
/// key condition per key joined with `or`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidCondition`] if `keys` is empty or mixes
/// entity types.
pub fn keys(keys: &[Key]) -> DomainResult<Condition> {
    let first = keys
        .first()
        .ok_or_else(|| DomainError::invalid_condition("at least one key is required"))?;
    let entity_type = first.entity_type();
    if let Some(other) = keys.iter().find(|k| k.entity_type() != entity_type) {
        return Err(DomainError::invalid_condition(format!(
            "keys must share an entity type, found {entity_type} and {}",
            other.entity_type()
        )));
    }
    if first.is_composite() {
        if keys.len() == 1 {
            return Ok(key(first));
        }
        return Ok(Condition::combination(
            entity_type.clone(),
            Conjunction::Or,
            keys.iter().map(key).collect(),
        ));
    }
    let Some((attribute, _)) = first.components().first() else {
        return Err(DomainError::invalid_condition(format!(
            "key of {entity_type} has no components"
        )));
    };
    Ok(column(attribute).in_values(keys.iter().map(|k| k.value().clone())))
}

/// A verbatim SQL fragment with bound values.
///
/// `attributes` names the column each value binds to, in placeholder order.
///
/// # Errors
///
/// Returns [`DomainError::InvalidCondition`] if the attribute and value
/// counts differ.
pub fn custom(
    entity_type: EntityType,
    sql: impl Into<String>,
    attributes: Vec<Attribute>,
    values: Vec<Value>,
) -> DomainResult<Condition> {
    CustomCondition::try_from(CustomConditionFields {
        entity_type,
        sql: sql.into(),
        attributes,
        values,
    })
    .map(Condition::Custom)
}

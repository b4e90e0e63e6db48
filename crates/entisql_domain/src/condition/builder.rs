//! Condition builders for columns and foreign keys.

use super::{ColumnCondition, Condition, Conjunction, Operator};
use crate::attribute::{Attribute, ForeignKey};
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::key::Key;
use entisql_db::Value;

/// Starts a condition over a column attribute.
#[must_use]
pub fn column(attribute: &Attribute) -> ColumnConditionBuilder {
    ColumnConditionBuilder {
        attribute: attribute.clone(),
    }
}

/// Starts a condition over a foreign key.
#[must_use]
pub fn foreign_key(foreign_key: &ForeignKey) -> ForeignKeyConditionBuilder {
    ForeignKeyConditionBuilder {
        foreign_key: foreign_key.clone(),
    }
}

/// Builds conditions over one column.
#[derive(Debug, Clone)]
pub struct ColumnConditionBuilder {
    attribute: Attribute,
}

impl ColumnConditionBuilder {
    fn leaf(self, operator: Operator, values: Vec<Value>, case_sensitive: bool) -> Condition {
        Condition::Column(ColumnCondition {
            attribute: self.attribute,
            operator,
            values,
            case_sensitive,
        })
    }

    fn single(self, operator: Operator, value: Value, case_sensitive: bool) -> Condition {
        let values = if value.is_null() && matches!(operator, Operator::Equal | Operator::NotEqual) {
            Vec::new()
        } else {
            vec![value]
        };
        self.leaf(operator, values, case_sensitive)
    }

    /// `col = ?`; a null value gives `col is null`.
    #[must_use]
    pub fn equal_to(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::Equal, value.into(), true)
    }

    /// `upper(col) = upper(?)` for text columns.
    #[must_use]
    pub fn equal_to_ignore_case(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::Equal, value.into(), false)
    }

    /// `col <> ?`; a null value gives `col is not null`.
    #[must_use]
    pub fn not_equal_to(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::NotEqual, value.into(), true)
    }

    /// `upper(col) <> upper(?)` for text columns.
    #[must_use]
    pub fn not_equal_to_ignore_case(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::NotEqual, value.into(), false)
    }

    /// `col is null`
    #[must_use]
    pub fn is_null(self) -> Condition {
        self.leaf(Operator::Equal, Vec::new(), true)
    }

    /// `col is not null`
    #[must_use]
    pub fn is_not_null(self) -> Condition {
        self.leaf(Operator::NotEqual, Vec::new(), true)
    }

    /// `col < ?`
    #[must_use]
    pub fn less_than(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::LessThan, value.into(), true)
    }

    /// `col <= ?`
    #[must_use]
    pub fn less_than_or_equal_to(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::LessThanOrEqual, value.into(), true)
    }

    /// `col > ?`
    #[must_use]
    pub fn greater_than(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::GreaterThan, value.into(), true)
    }

    /// `col >= ?`
    #[must_use]
    pub fn greater_than_or_equal_to(self, value: impl Into<Value>) -> Condition {
        self.single(Operator::GreaterThanOrEqual, value.into(), true)
    }

    /// `col like ?`
    #[must_use]
    pub fn like(self, pattern: impl Into<Value>) -> Condition {
        self.single(Operator::Like, pattern.into(), true)
    }

    /// `upper(col) like upper(?)`
    #[must_use]
    pub fn like_ignore_case(self, pattern: impl Into<Value>) -> Condition {
        self.single(Operator::Like, pattern.into(), false)
    }

    /// `col not like ?`
    #[must_use]
    pub fn not_like(self, pattern: impl Into<Value>) -> Condition {
        self.single(Operator::NotLike, pattern.into(), true)
    }

    /// `col in (?, ...)`; no values give `col in ()`.
    #[must_use]
    pub fn in_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect();
        self.leaf(Operator::In, values, true)
    }

    /// `upper(col) in (upper(?), ...)`
    #[must_use]
    pub fn in_ignore_case<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect();
        self.leaf(Operator::In, values, false)
    }

    /// `col not in (?, ...)`; no values give `col not in ()`.
    #[must_use]
    pub fn not_in_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect();
        self.leaf(Operator::NotIn, values, true)
    }

    /// `(col >= ? and col <= ?)`
    ///
    /// # Errors
    ///
    /// Returns [`crate::DomainError::InvalidCondition`] if a bound is null.
    pub fn between(self, lower: impl Into<Value>, upper: impl Into<Value>) -> DomainResult<Condition> {
        self.operator(Operator::Between, vec![lower.into(), upper.into()])
    }

    /// `(col > ? and col < ?)`
    ///
    /// # Errors
    ///
    /// Returns [`crate::DomainError::InvalidCondition`] if a bound is null.
    pub fn between_exclusive(self, lower: impl Into<Value>, upper: impl Into<Value>) -> DomainResult<Condition> {
        self.operator(Operator::BetweenExclusive, vec![lower.into(), upper.into()])
    }

    /// `(col < ? or col > ?)`
    ///
    /// # Errors
    ///
    /// Returns [`crate::DomainError::InvalidCondition`] if a bound is null.
    pub fn not_between(self, lower: impl Into<Value>, upper: impl Into<Value>) -> DomainResult<Condition> {
        self.operator(Operator::NotBetween, vec![lower.into(), upper.into()])
    }

    /// `(col <= ? or col >= ?)`
    ///
    /// # Errors
    ///
    /// Returns [`crate::DomainError::InvalidCondition`] if a bound is null.
    pub fn not_between_exclusive(
        self,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> DomainResult<Condition> {
        self.operator(Operator::NotBetweenExclusive, vec![lower.into(), upper.into()])
    }

    /// A condition with an explicit operator and operand list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DomainError::InvalidCondition`] if the values do not
    /// suit the operator.
    pub fn operator(self, operator: Operator, values: Vec<Value>) -> DomainResult<Condition> {
        ColumnCondition::new(self.attribute, operator, values, true).map(Condition::Column)
    }
}

/// Builds conditions over a foreign key's referencing columns.
///
/// Single column keys produce plain column conditions. Composite keys
/// produce one condition per column joined with `and`, and collections of
/// composite keys join those with `or`.
#[derive(Debug, Clone)]
pub struct ForeignKeyConditionBuilder {
    foreign_key: ForeignKey,
}

impl ForeignKeyConditionBuilder {
    /// Rows referencing `entity`; `None` gives a null check.
    #[must_use]
    pub fn equal_to(self, entity: Option<&Entity>) -> Condition {
        let values = self.entity_values(entity);
        self.compare(Operator::Equal, values)
    }

    /// Rows referencing the row identified by `key`.
    #[must_use]
    pub fn equal_to_key(self, key: &Key) -> Condition {
        let values = self.key_values(key);
        self.compare(Operator::Equal, values)
    }

    /// Rows not referencing `entity`; `None` gives a not-null check.
    #[must_use]
    pub fn not_equal_to(self, entity: Option<&Entity>) -> Condition {
        let values = self.entity_values(entity);
        self.compare(Operator::NotEqual, values)
    }

    /// Rows without a reference.
    #[must_use]
    pub fn is_null(self) -> Condition {
        let values = vec![Value::Null; self.foreign_key.references().len()];
        self.compare(Operator::Equal, values)
    }

    /// Rows with a reference.
    #[must_use]
    pub fn is_not_null(self) -> Condition {
        let values = vec![Value::Null; self.foreign_key.references().len()];
        self.compare(Operator::NotEqual, values)
    }

    /// Rows referencing any of `entities`.
    #[must_use]
    pub fn in_entities<'a>(self, entities: impl IntoIterator<Item = &'a Entity>) -> Condition {
        let rows = entities
            .into_iter()
            .map(|entity| self.entity_values(Some(entity)))
            .collect();
        self.many(Operator::Equal, rows)
    }

    /// Rows referencing any of `keys`.
    #[must_use]
    pub fn in_keys<'a>(self, keys: impl IntoIterator<Item = &'a Key>) -> Condition {
        let rows = keys.into_iter().map(|key| self.key_values(key)).collect();
        self.many(Operator::Equal, rows)
    }

    /// Rows referencing none of `entities`.
    #[must_use]
    pub fn not_in_entities<'a>(self, entities: impl IntoIterator<Item = &'a Entity>) -> Condition {
        let rows = entities
            .into_iter()
            .map(|entity| self.entity_values(Some(entity)))
            .collect();
        self.many(Operator::NotEqual, rows)
    }

    fn entity_values(&self, entity: Option<&Entity>) -> Vec<Value> {
        self.foreign_key
            .references()
            .iter()
            .map(|reference| entity.map(|e| e.value(&reference.referenced)).unwrap_or_default())
            .collect()
    }

    fn key_values(&self, key: &Key) -> Vec<Value> {
        self.foreign_key
            .references()
            .iter()
            .map(|reference| key.get(&reference.referenced).cloned().unwrap_or_default())
            .collect()
    }

    /// One comparison per referencing column, `and`-joined when composite.
    fn compare(&self, operator: Operator, values: Vec<Value>) -> Condition {
        let mut conditions: Vec<Condition> = self
            .foreign_key
            .references()
            .iter()
            .zip(values)
            .map(|(reference, value)| column(&reference.column).single(operator, value, true))
            .collect();
        if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Condition::combination(self.foreign_key.entity_type().clone(), Conjunction::And, conditions)
        }
    }

    fn many(&self, operator: Operator, rows: Vec<Vec<Value>>) -> Condition {
        if !self.foreign_key.is_composite() {
            let values = rows.into_iter().flatten();
            let builder = self.single_column();
            return match operator {
                Operator::NotEqual => builder.not_in_values(values),
                _ => builder.in_values(values),
            };
        }
        match rows.len() {
            0 => {
                let conditions = self
                    .foreign_key
                    .references()
                    .iter()
                    .map(|reference| {
                        let builder = column(&reference.column);
                        match operator {
                            Operator::NotEqual => builder.not_in_values(Vec::<Value>::new()),
                            _ => builder.in_values(Vec::<Value>::new()),
                        }
                    })
                    .collect();
                Condition::combination(self.foreign_key.entity_type().clone(), Conjunction::And, conditions)
            }
            1 => self.compare(operator, rows.into_iter().flatten().collect()),
            _ => {
                let conditions = rows
                    .into_iter()
                    .map(|values| self.compare(operator, values))
                    .collect();
                Condition::combination(self.foreign_key.entity_type().clone(), Conjunction::Or, conditions)
            }
        }
    }

    fn single_column(&self) -> ColumnConditionBuilder {
        let attribute = self
            .foreign_key
            .references()
            .first()
            .map_or_else(|| self.foreign_key.attribute().clone(), |r| r.column.clone());
        ColumnConditionBuilder { attribute }
    }
}

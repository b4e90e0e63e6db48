//! Entity keys.

use crate::attribute::{Attribute, EntityType};
use crate::definition::EntityDefinition;
use crate::error::{DomainError, DomainResult};
use entisql_db::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies one row of an entity type.
///
/// Components are kept in key order. Two keys are equal when their entity
/// type and all component values are equal; a key with null components is
/// well-formed but does not identify a stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    entity_type: EntityType,
    components: Vec<(Attribute, Value)>,
}

impl Key {
    /// Creates a key from its components, in key order.
    #[must_use]
    pub fn new(entity_type: EntityType, components: Vec<(Attribute, Value)>) -> Self {
        Self {
            entity_type,
            components,
        }
    }

    /// Creates a primary key for `definition` from values in key order.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidValue`] if the number of values does not
    /// match the number of primary key columns, or a value has the wrong
    /// type.
    pub fn primary_key(definition: &EntityDefinition, values: Vec<Value>) -> DomainResult<Self> {
        let columns = definition.primary_key_columns();
        if columns.len() != values.len() {
            return Err(DomainError::invalid_value(
                definition.entity_type(),
                format!(
                    "primary key has {} columns, got {} values",
                    columns.len(),
                    values.len()
                ),
            ));
        }
        let components = columns
            .into_iter()
            .zip(values)
            .map(|(column, value)| {
                if column.value_type().accepts(&value) {
                    Ok((column.attribute().clone(), value))
                } else {
                    Err(DomainError::invalid_value(
                        column.attribute(),
                        format!("expected {}, got {}", column.value_type(), value.type_name()),
                    ))
                }
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self::new(definition.entity_type().clone(), components))
    }

    /// Returns the entity type.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Returns the components in key order.
    #[must_use]
    pub fn components(&self) -> &[(Attribute, Value)] {
        &self.components
    }

    /// Returns the key attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.components.iter().map(|(attribute, _)| attribute)
    }

    /// Returns the key values in key order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.components.iter().map(|(_, value)| value)
    }

    /// Returns the value of one component.
    #[must_use]
    pub fn get(&self, attribute: &Attribute) -> Option<&Value> {
        self.components
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, value)| value)
    }

    /// Returns the value of a single column key.
    #[must_use]
    pub fn value(&self) -> &Value {
        self.components.first().map_or(&Value::Null, |(_, value)| value)
    }

    /// Returns true if the key has more than one component.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.components.len() > 1
    }

    /// Returns true if every component is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.components.iter().all(|(_, value)| value.is_null())
    }

    /// Returns true if any component is null.
    #[must_use]
    pub fn has_null(&self) -> bool {
        self.components.iter().any(|(_, value)| value.is_null())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.components == other.components
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.components.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.entity_type)?;
        for (index, (attribute, value)) in self.components.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={value}", attribute.name())?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ColumnDefinition;
    use crate::value_type::ValueType;
    use std::collections::HashSet;

    const LINE: EntityType = EntityType::new("line");
    const LINE_ORDER: Attribute = Attribute::new(LINE, "order_id");
    const LINE_NO: Attribute = Attribute::new(LINE, "line_no");

    fn line() -> EntityDefinition {
        EntityDefinition::builder(LINE, "order_line")
            .column(ColumnDefinition::primary_key(LINE_ORDER, ValueType::Integer))
            .column(ColumnDefinition::primary_key(LINE_NO, ValueType::Integer).primary_key_index(1))
            .build()
    }

    #[test]
    fn primary_key_from_values() {
        let key = Key::primary_key(&line(), vec![Value::from(1), Value::from(2)]).unwrap();
        assert!(key.is_composite());
        assert_eq!(key.get(&LINE_NO), Some(&Value::Integer(2)));
        assert_eq!(key.to_string(), "line[order_id=1, line_no=2]");
    }

    #[test]
    fn primary_key_value_count_must_match() {
        let result = Key::primary_key(&line(), vec![Value::from(1)]);
        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
        let result = Key::primary_key(&line(), vec![Value::from(1), Value::from("x")]);
        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
    }

    #[test]
    fn equality_by_type_and_values() {
        let a = Key::primary_key(&line(), vec![Value::from(1), Value::from(2)]).unwrap();
        let b = Key::primary_key(&line(), vec![Value::from(1), Value::from(2)]).unwrap();
        let c = Key::primary_key(&line(), vec![Value::from(1), Value::Null]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c.has_null());
        assert!(!c.is_null());

        let set: HashSet<Key> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}

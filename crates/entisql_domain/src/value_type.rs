//! Attribute value types and column converters.

use entisql_db::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean; stored as 0/1 where the database lacks a boolean type.
    Boolean,
    /// 32 bit integer.
    Integer,
    /// 64 bit integer.
    Long,
    /// Double precision float.
    Double,
    /// Fixed scale decimal, held as a double rounded to `scale` digits.
    Decimal {
        /// Fraction digits kept.
        scale: u32,
    },
    /// Text.
    String,
    /// A single character, held as text.
    Character,
    /// ISO-8601 date (`yyyy-mm-dd`), held as text.
    Date,
    /// ISO-8601 timestamp, held as text.
    Timestamp,
    /// Binary large object.
    Blob,
}

impl ValueType {
    /// Returns true if `value` can be stored in an attribute of this type.
    ///
    /// Null is accepted by every type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Boolean, Value::Bool(_))
            | (Self::Integer | Self::Long, Value::Integer(_))
            | (Self::Double | Self::Decimal { .. }, Value::Double(_) | Value::Integer(_))
            | (Self::String | Self::Date | Self::Timestamp, Value::Text(_))
            | (Self::Blob, Value::Blob(_)) => true,
            (Self::Character, Value::Text(text)) => text.chars().count() == 1,
            _ => false,
        }
    }

    /// Converts a value read from a result column into this type.
    ///
    /// Values that cannot be converted are returned unchanged.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Boolean, Value::Integer(v)) => Value::Bool(v != 0),
            #[allow(clippy::cast_precision_loss)]
            (Self::Double, Value::Integer(v)) => Value::Double(v as f64),
            (Self::Decimal { scale }, value) => match value.as_f64() {
                Some(v) => Value::Double(round(v, *scale)),
                None => value,
            },
            (_, value) => value,
        }
    }

    /// Returns true for [`ValueType::Blob`].
    #[must_use]
    pub const fn is_blob(&self) -> bool {
        matches!(self, Self::Blob)
    }

    /// Returns true for the text backed types.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::String | Self::Character)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::Decimal { scale } => write!(f, "decimal({scale})"),
            Self::String => f.write_str("string"),
            Self::Character => f.write_str("character"),
            Self::Date => f.write_str("date"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Blob => f.write_str("blob"),
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn round(value: f64, scale: u32) -> f64 {
    let factor = 10f64.powi(scale.min(15) as i32);
    (value * factor).round() / factor
}

/// Converts between an attribute's value and the value stored in its column.
///
/// Used for columns whose storage representation differs from the entity
/// value, such as booleans kept as `'Y'`/`'N'` or enums kept as codes.
pub trait ColumnConverter: Send + Sync + fmt::Debug {
    /// Converts an entity value to the value bound to a statement.
    fn to_column(&self, value: &Value) -> Value;

    /// Converts a value read from a result column to the entity value.
    fn from_column(&self, value: Value) -> Value;
}

/// Stores booleans as a pair of column values.
#[derive(Debug, Clone)]
pub struct BooleanConverter {
    true_value: Value,
    false_value: Value,
}

impl BooleanConverter {
    /// Creates a converter storing `true`/`false` as the given values.
    pub fn new(true_value: impl Into<Value>, false_value: impl Into<Value>) -> Self {
        Self {
            true_value: true_value.into(),
            false_value: false_value.into(),
        }
    }
}

impl ColumnConverter for BooleanConverter {
    fn to_column(&self, value: &Value) -> Value {
        match value.as_bool() {
            Some(true) => self.true_value.clone(),
            Some(false) => self.false_value.clone(),
            None => Value::Null,
        }
    }

    fn from_column(&self, value: Value) -> Value {
        if value.is_null() {
            Value::Null
        } else {
            Value::Bool(value == self.true_value)
        }
    }
}

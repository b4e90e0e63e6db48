//! Condition operators.

use crate::error::{DomainError, DomainResult};
use entisql_db::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The comparison applied by a column condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `col = ?`, or `col is null` without a value.
    Equal,
    /// `col <> ?`, or `col is not null` without a value.
    NotEqual,
    /// `col < ?`
    LessThan,
    /// `col <= ?`
    LessThanOrEqual,
    /// `col > ?`
    GreaterThan,
    /// `col >= ?`
    GreaterThanOrEqual,
    /// `col like ?`
    Like,
    /// `col not like ?`
    NotLike,
    /// `col in (?, ...)`
    In,
    /// `col not in (?, ...)`
    NotIn,
    /// `(col >= ? and col <= ?)`
    Between,
    /// `(col > ? and col < ?)`
    BetweenExclusive,
    /// `(col < ? or col > ?)`
    NotBetween,
    /// `(col <= ? or col >= ?)`
    NotBetweenExclusive,
}

impl Operator {
    /// Returns true for the four between operators.
    #[must_use]
    pub const fn is_between(&self) -> bool {
        matches!(
            self,
            Self::Between | Self::BetweenExclusive | Self::NotBetween | Self::NotBetweenExclusive
        )
    }

    /// Checks that `values` is a valid operand list for this operator.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCondition`] on a wrong value count, or
    /// on a null bound for a between operator.
    pub fn validate(&self, values: &[Value]) -> DomainResult<()> {
        match self {
            Self::Equal | Self::NotEqual if values.len() > 1 => Err(DomainError::invalid_condition(
                format!("{self} accepts at most one value, got {}", values.len()),
            )),
            Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::Like
            | Self::NotLike
                if values.len() != 1 =>
            {
                Err(DomainError::invalid_condition(format!(
                    "{self} requires exactly one value, got {}",
                    values.len()
                )))
            }
            op if op.is_between() && values.len() != 2 => Err(DomainError::invalid_condition(
                format!("{op} requires exactly two values, got {}", values.len()),
            )),
            op if op.is_between() && values.iter().any(Value::is_null) => Err(
                DomainError::invalid_condition(format!("{op} requires non-null bound values")),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal",
            Self::NotEqual => "not equal",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal",
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Between => "between",
            Self::BetweenExclusive => "between exclusive",
            Self::NotBetween => "not between",
            Self::NotBetweenExclusive => "not between exclusive",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_needs_two_non_null_values() {
        let one = [Value::from(1)];
        let null_bound = [Value::from(1), Value::Null];
        let bounds = [Value::from(1), Value::from(2)];
        for op in [
            Operator::Between,
            Operator::BetweenExclusive,
            Operator::NotBetween,
            Operator::NotBetweenExclusive,
        ] {
            assert!(op.validate(&one).is_err());
            assert!(op.validate(&null_bound).is_err());
            assert!(op.validate(&bounds).is_ok());
        }
    }

    #[test]
    fn wrong_count_and_null_bound_messages_differ() {
        let count = Operator::Between.validate(&[Value::from(1)]).unwrap_err();
        let null = Operator::Between.validate(&[Value::Null, Value::from(1)]).unwrap_err();
        assert_ne!(count, null);
    }

    #[test]
    fn single_value_operators() {
        assert!(Operator::Equal.validate(&[]).is_ok());
        assert!(Operator::Equal.validate(&[Value::from(1), Value::from(2)]).is_err());
        assert!(Operator::LessThan.validate(&[]).is_err());
        assert!(Operator::Like.validate(&[Value::from("a%")]).is_ok());
        assert!(Operator::In.validate(&[]).is_ok());
    }
}

//! Error types for schema, entity and condition operations.

use thiserror::Error;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised while defining schemas, building entities or rendering
/// conditions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A condition is malformed.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// An attribute is unknown, or is not usable where it was given.
    #[error("invalid attribute {attribute}: {message}")]
    InvalidAttribute {
        /// The offending attribute.
        attribute: String,
        /// What is wrong with it.
        message: String,
    },

    /// An attribute has the wrong value type for the operation.
    #[error("attribute {attribute} is of type {actual}, expected {expected}")]
    InvalidAttributeType {
        /// The offending attribute.
        attribute: String,
        /// The required type.
        expected: String,
        /// The declared type.
        actual: String,
    },

    /// A value does not fit the attribute it was put into.
    #[error("invalid value for {attribute}: {message}")]
    InvalidValue {
        /// The attribute.
        attribute: String,
        /// What is wrong with the value.
        message: String,
    },

    /// No definition is registered for an entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// The schema is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl DomainError {
    /// Creates an invalid condition error.
    pub fn invalid_condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }

    /// Creates an invalid attribute error.
    pub fn invalid_attribute(attribute: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(attribute: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema(message.into())
    }
}

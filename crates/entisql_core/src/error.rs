//! Error types for entity connection operations.

use entisql_db::{DbError, Value};
use entisql_domain::{DomainError, Entity, Key};
use thiserror::Error;

/// Result type for entity connection operations.
pub type EntityResult<T> = Result<T, EntityError>;

/// Errors raised by an [`crate::EntityConnection`].
#[derive(Debug, Error)]
pub enum EntityError {
    /// A condition is malformed.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// An attribute is unknown, or is not a column where one is required.
    #[error("invalid attribute {attribute}: {message}")]
    InvalidAttribute {
        /// The offending attribute.
        attribute: String,
        /// What is wrong with it.
        message: String,
    },

    /// An attribute has the wrong type for the operation.
    #[error("attribute {attribute} is of type {actual}, expected {expected}")]
    InvalidAttributeType {
        /// The offending attribute.
        attribute: String,
        /// The required type.
        expected: String,
        /// The declared type.
        actual: String,
    },

    /// An entity cannot be written as it is.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// The schema is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// No definition is registered for an entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// A write was attempted on a read-only entity type.
    #[error("entity type {0} is read-only")]
    ReadOnlyViolation(String),

    /// A single row select found nothing.
    #[error("record not found")]
    RecordNotFound,

    /// A single row select found more than one row.
    #[error("multiple records found")]
    MultipleRecordsFound,

    /// The row changed, or disappeared, since the entity was selected.
    #[error("record modified: {}", .entity.key())]
    RecordModified {
        /// The caller's stale entity.
        entity: Box<Entity>,
        /// The row as currently stored, `None` if it was deleted.
        current: Option<Box<Entity>>,
    },

    /// The database rejected a statement.
    ///
    /// Displays the dialect's translated message; the statement and its
    /// parameters are kept for logging.
    #[error("{message}")]
    Database {
        /// Translated message.
        message: String,
        /// The failing statement, if one was executing.
        sql: Option<String>,
        /// The bound parameters.
        values: Vec<Value>,
        /// The driver error.
        #[source]
        source: DbError,
    },

    /// Transaction demarcation out of order.
    #[error("transaction state: {0}")]
    TransactionState(String),

    /// No function or procedure is registered under the id.
    #[error("no function or procedure registered as '{0}'")]
    FunctionNotFound(String),

    /// The operation is not available for this entity type or database.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl EntityError {
    /// Creates a read-only violation error.
    pub fn read_only(entity_type: impl ToString) -> Self {
        Self::ReadOnlyViolation(entity_type.to_string())
    }

    /// Creates an invalid entity error.
    pub fn invalid_entity(message: impl Into<String>) -> Self {
        Self::InvalidEntity(message.into())
    }

    /// Creates a transaction state error.
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState(message.into())
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Creates a record modified error.
    pub fn record_modified(entity: Entity, current: Option<Entity>) -> Self {
        Self::RecordModified {
            entity: Box::new(entity),
            current: current.map(Box::new),
        }
    }

    /// Returns the key of the stale entity for a record modified error.
    #[must_use]
    pub fn modified_key(&self) -> Option<Key> {
        match self {
            Self::RecordModified { entity, .. } => Some(entity.key()),
            _ => None,
        }
    }
}

impl From<DomainError> for EntityError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidCondition(message) => Self::InvalidCondition(message),
            DomainError::InvalidAttribute { attribute, message } => {
                Self::InvalidAttribute { attribute, message }
            }
            DomainError::InvalidAttributeType {
                attribute,
                expected,
                actual,
            } => Self::InvalidAttributeType {
                attribute,
                expected,
                actual,
            },
            DomainError::InvalidValue { attribute, message } => {
                Self::InvalidEntity(format!("{attribute}: {message}"))
            }
            DomainError::UnknownEntityType(entity_type) => Self::UnknownEntityType(entity_type),
            DomainError::InvalidSchema(message) => Self::InvalidSchema(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        let error: EntityError = DomainError::invalid_condition("bad").into();
        assert!(matches!(error, EntityError::InvalidCondition(m) if m == "bad"));

        let error: EntityError = DomainError::invalid_attribute("emp.x", "not found").into();
        assert!(matches!(error, EntityError::InvalidAttribute { .. }));

        let error: EntityError = DomainError::invalid_value("emp.sal", "expected double").into();
        assert!(matches!(error, EntityError::InvalidEntity(_)));
    }

    #[test]
    fn database_error_displays_translated_message() {
        let error = EntityError::Database {
            message: "Unique key constraint violation".to_string(),
            sql: Some("insert into t(id) values(?)".to_string()),
            values: vec![Value::from(1)],
            source: DbError::Closed,
        };
        assert_eq!(error.to_string(), "Unique key constraint violation");
        assert!(std::error::Error::source(&error).is_some());
    }
}

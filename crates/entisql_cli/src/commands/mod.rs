//! CLI command implementations.

pub mod count;
pub mod delete_department;
pub mod init;
pub mod list;

use entisql_core::LocalEntityConnection;
use entisql_db::SqliteConnection;
use entisql_domain::{Entities, EntityType, Value};
use entisql_testkit::domain;
use std::path::Path;
use std::sync::Arc;

/// Opens an engine over an existing demo database.
pub fn open(path: &Path) -> Result<LocalEntityConnection, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No database found at {}", path.display()).into());
    }
    let entities = Arc::new(domain::entities()?);
    let sqlite = SqliteConnection::open(path)?;
    Ok(LocalEntityConnection::new(entities, sqlite))
}

/// Looks up a demo entity type by name.
pub fn entity_type(entities: &Entities, name: &str) -> Result<EntityType, Box<dyn std::error::Error>> {
    if let Some(definition) = entities.definitions().find(|d| d.entity_type().name() == name) {
        return Ok(definition.entity_type().clone());
    }
    let mut known: Vec<&str> = entities.definitions().map(|d| d.entity_type().name()).collect();
    known.sort_unstable();
    Err(format!("Unknown entity type '{name}', expected one of: {}", known.join(", ")).into())
}

/// Converts a column value for JSON output.
pub fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::Integer(v) => serde_json::Value::from(*v),
        Value::Double(v) => serde_json::Value::from(*v),
        Value::Text(v) => serde_json::Value::String(v.clone()),
        Value::Blob(v) => serde_json::Value::String(format!("<{} bytes>", v.len())),
    }
}

/// Formats a column value for text output.
pub fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(v) => v.clone(),
        Value::Blob(v) => format!("<{} bytes>", v.len()),
        other => other.to_string(),
    }
}

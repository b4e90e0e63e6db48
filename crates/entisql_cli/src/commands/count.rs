//! Count command implementation.

use super::{entity_type, open};
use entisql_core::EntityConnection;
use entisql_domain::condition;
use std::path::Path;

/// Runs the count command.
pub fn run(path: &Path, entity: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", count(path, entity)?);
    Ok(())
}

fn count(path: &Path, entity: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let connection = open(path)?;
    let entity_type = entity_type(connection.entities(), entity)?;
    Ok(connection.row_count(&condition::all(entity_type))?)
}

//! Init command implementation.

use entisql_db::SqliteConnection;
use entisql_testkit::domain::{self, DEMO_EMPLOYEES};
use std::path::Path;
use tracing::info;

/// Runs the init command.
pub fn run(path: &Path, with_data: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("Database already exists at {}", path.display()).into());
    }
    let mut connection = SqliteConnection::open(path)?;
    domain::install(&mut connection, with_data)?;
    info!(path = %path.display(), with_data, "demo schema installed");

    println!("Created demo database at {}", path.display());
    if with_data {
        println!("  {DEMO_EMPLOYEES} employees in 4 departments");
    }
    Ok(())
}

//! Delete-department command implementation.

use super::open;
use entisql_core::{EntityConnection, EntityResult, LocalEntityConnection};
use entisql_domain::condition::column;
use entisql_testkit::domain::{DEPT, EMP_DEPT};
use std::path::Path;
use tracing::info;

/// Rows removed by one deletion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Deleted {
    /// Departments removed, zero or one.
    pub departments: usize,
    /// Employees removed along with the department.
    pub employees: usize,
}

/// Runs the delete-department command.
pub fn run(path: &Path, id: i64, cascade: bool) -> Result<(), Box<dyn std::error::Error>> {
    let connection = open(path)?;
    let deleted = delete_department(&connection, id, cascade)?;
    if deleted.departments == 0 {
        println!("No department {id}");
    } else {
        println!("Deleted department {id} and {} employees", deleted.employees);
    }
    Ok(())
}

/// Deletes a department in one transaction, and its employees first when
/// `cascade` is set.
pub fn delete_department(connection: &LocalEntityConnection, id: i64, cascade: bool) -> EntityResult<Deleted> {
    let key = connection.entities().primary_key(&DEPT, vec![id.into()])?;
    connection.begin_transaction()?;
    let result = (|| -> EntityResult<Deleted> {
        let employees = if cascade {
            connection.delete_where(&column(&EMP_DEPT).equal_to(id))?
        } else {
            0
        };
        let departments = connection.delete_key(&key)?;
        Ok(Deleted { departments, employees })
    })();
    match result {
        Ok(deleted) => {
            connection.commit_transaction()?;
            info!(department = id, employees = deleted.employees, "department deleted");
            Ok(deleted)
        }
        Err(error) => {
            connection.rollback_transaction()?;
            Err(error)
        }
    }
}

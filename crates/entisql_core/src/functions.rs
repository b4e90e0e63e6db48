//! Registered database functions and procedures.

use crate::connection::EntityConnection;
use crate::error::EntityResult;
use entisql_db::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Logic run against an entity connection that returns a value.
///
/// Functions run inside the calling connection's critical section and
/// transaction; they may use `connection` freely.
pub trait DatabaseFunction: Send + Sync {
    /// Runs the function.
    ///
    /// # Errors
    ///
    /// Returns whatever error the function's work produces.
    fn execute(&self, connection: &dyn EntityConnection, arguments: &[Value]) -> EntityResult<Value>;
}

impl<F> DatabaseFunction for F
where
    F: Fn(&dyn EntityConnection, &[Value]) -> EntityResult<Value> + Send + Sync,
{
    fn execute(&self, connection: &dyn EntityConnection, arguments: &[Value]) -> EntityResult<Value> {
        self(connection, arguments)
    }
}

/// Logic run against an entity connection for its side effects.
pub trait DatabaseProcedure: Send + Sync {
    /// Runs the procedure.
    ///
    /// # Errors
    ///
    /// Returns whatever error the procedure's work produces.
    fn execute(&self, connection: &dyn EntityConnection, arguments: &[Value]) -> EntityResult<()>;
}

impl<F> DatabaseProcedure for F
where
    F: Fn(&dyn EntityConnection, &[Value]) -> EntityResult<()> + Send + Sync,
{
    fn execute(&self, connection: &dyn EntityConnection, arguments: &[Value]) -> EntityResult<()> {
        self(connection, arguments)
    }
}

/// Functions and procedures by id.
#[derive(Clone, Default)]
pub struct Functions {
    functions: HashMap<String, Arc<dyn DatabaseFunction>>,
    procedures: HashMap<String, Arc<dyn DatabaseProcedure>>,
}

impl Functions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, replacing any function with the same id.
    #[must_use]
    pub fn function(mut self, id: impl Into<String>, function: impl DatabaseFunction + 'static) -> Self {
        self.functions.insert(id.into(), Arc::new(function));
        self
    }

    /// Registers a procedure, replacing any procedure with the same id.
    #[must_use]
    pub fn procedure(mut self, id: impl Into<String>, procedure: impl DatabaseProcedure + 'static) -> Self {
        self.procedures.insert(id.into(), Arc::new(procedure));
        self
    }

    /// Returns the function registered as `id`.
    #[must_use]
    pub fn get_function(&self, id: &str) -> Option<Arc<dyn DatabaseFunction>> {
        self.functions.get(id).cloned()
    }

    /// Returns the procedure registered as `id`.
    #[must_use]
    pub fn get_procedure(&self, id: &str) -> Option<Arc<dyn DatabaseProcedure>> {
        self.procedures.get(id).cloned()
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        let mut procedures: Vec<&String> = self.procedures.keys().collect();
        functions.sort();
        procedures.sort();
        f.debug_struct("Functions")
            .field("functions", &functions)
            .field("procedures", &procedures)
            .finish()
    }
}

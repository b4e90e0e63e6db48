//! Property-based test generators using proptest.
//!
//! Generated employees fit the demo schema: names are non-empty, salaries
//! carry at most two fraction digits and dates are valid ISO dates.

use crate::domain::{
    EMP, EMP_ACTIVE, EMP_COMM, EMP_DEPT, EMP_HIREDATE, EMP_ID, EMP_JOB, EMP_NAME, EMP_SAL,
};
use entisql_domain::{DomainResult, Entities, Entity, Value};
use proptest::prelude::*;

/// First id handed out by [`employees_strategy`], above the demo rows.
pub const FIRST_GENERATED_ID: i64 = 10_000;

/// Department numbers present in the demo data.
pub const DEMO_DEPARTMENTS: [i64; 4] = [10, 20, 30, 40];

/// Column values for one employee row.
#[derive(Debug, Clone)]
pub struct EmployeeValues {
    /// Employee number.
    pub id: i64,
    /// Name.
    pub name: String,
    /// Job title.
    pub job: Option<String>,
    /// Hire date, `yyyy-mm-dd`.
    pub hiredate: String,
    /// Salary.
    pub salary: f64,
    /// Commission.
    pub commission: Option<f64>,
    /// Department number.
    pub department: i64,
    /// Active flag.
    pub active: bool,
}

impl EmployeeValues {
    /// Builds an employee entity from these values.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit its column.
    pub fn to_entity(&self, entities: &Entities) -> DomainResult<Entity> {
        entities
            .entity(&EMP)?
            .with(&EMP_ID, self.id)
            .with(&EMP_NAME, self.name.as_str())
            .with(&EMP_JOB, self.job.clone().map_or(Value::Null, Value::from))
            .with(&EMP_HIREDATE, self.hiredate.as_str())
            .with(&EMP_SAL, self.salary)
            .with(&EMP_COMM, self.commission.map_or(Value::Null, Value::from))
            .with(&EMP_DEPT, self.department)
            .with(&EMP_ACTIVE, self.active)
            .build()
    }
}

/// Strategy for generating employee names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Za-z' ]{0,19}").expect("Invalid regex")
}

/// Strategy for generating amounts with two fraction digits.
pub fn amount_strategy() -> impl Strategy<Value = f64> {
    (0u32..1_000_000).prop_map(|cents| f64::from(cents) / 100.0)
}

/// Strategy for generating ISO dates.
pub fn date_strategy() -> impl Strategy<Value = String> {
    (1970u32..2030, 1u32..=12, 1u32..=28).prop_map(|(year, month, day)| format!("{year:04}-{month:02}-{day:02}"))
}

/// Strategy for generating one employee with the given id.
pub fn employee_strategy(id: i64) -> impl Strategy<Value = EmployeeValues> {
    (
        name_strategy(),
        prop::option::of(prop::sample::select(vec!["CLERK", "ANALYST", "MANAGER", "SALESMAN"])),
        date_strategy(),
        amount_strategy(),
        prop::option::of(amount_strategy()),
        prop::sample::select(DEMO_DEPARTMENTS.to_vec()),
        any::<bool>(),
    )
        .prop_map(move |(name, job, hiredate, salary, commission, department, active)| EmployeeValues {
            id,
            name,
            job: job.map(str::to_string),
            hiredate,
            salary,
            commission,
            department,
            active,
        })
}

/// Strategy for generating up to `max` employees with distinct ids,
/// starting at [`FIRST_GENERATED_ID`].
pub fn employees_strategy(max: usize) -> impl Strategy<Value = Vec<EmployeeValues>> {
    (1..=max.max(1)).prop_flat_map(|count| {
        (FIRST_GENERATED_ID..)
            .take(count)
            .map(employee_strategy)
            .collect::<Vec<_>>()
    })
}

//! The demo domain: a small personnel schema.
//!
//! Covers the shapes the engine has to handle: a foreign key chain
//! (employee, department, location), a self reference (manager), a
//! composite key referenced by a composite foreign key, a read-only view,
//! a custom select query, a grouped query, a blob column, a boolean column
//! stored as text and a generated key.

use entisql_db::{DbResult, SqliteConnection, Value};
use entisql_domain::condition::OrderBy;
use entisql_domain::{
    Attribute, AutomaticKeyGenerator, BooleanConverter, ColumnDefinition, DerivedDefinition, DomainResult,
    Entities, EntityDefinition, EntityType, ForeignKey, ForeignKeyDefinition, Reference, SelectQuery, ValueType,
};

/// Location, with a generated key.
pub const LOCATION: EntityType = EntityType::new("location");
/// Location id.
pub const LOCATION_ID: Attribute = Attribute::new(LOCATION, "locno");
/// City name.
pub const LOCATION_CITY: Attribute = Attribute::new(LOCATION, "city");

/// Department.
pub const DEPT: EntityType = EntityType::new("dept");
/// Department number.
pub const DEPT_ID: Attribute = Attribute::new(DEPT, "deptno");
/// Department name.
pub const DEPT_NAME: Attribute = Attribute::new(DEPT, "dname");
/// Location column.
pub const DEPT_LOCATION: Attribute = Attribute::new(DEPT, "locno");
const DEPT_LOCATION_REFS: &[Reference] = &[Reference::new(DEPT_LOCATION, LOCATION_ID)];
/// Department to location.
pub const DEPT_LOCATION_FK: ForeignKey = ForeignKey::new(DEPT, "location_fk", LOCATION, DEPT_LOCATION_REFS);

/// Employee.
pub const EMP: EntityType = EntityType::new("emp");
/// Employee number.
pub const EMP_ID: Attribute = Attribute::new(EMP, "empno");
/// Employee name.
pub const EMP_NAME: Attribute = Attribute::new(EMP, "ename");
/// Job title.
pub const EMP_JOB: Attribute = Attribute::new(EMP, "job");
/// Manager column.
pub const EMP_MGR: Attribute = Attribute::new(EMP, "mgr");
/// Hire date.
pub const EMP_HIREDATE: Attribute = Attribute::new(EMP, "hiredate");
/// Salary.
pub const EMP_SAL: Attribute = Attribute::new(EMP, "sal");
/// Commission.
pub const EMP_COMM: Attribute = Attribute::new(EMP, "comm");
/// Department column.
pub const EMP_DEPT: Attribute = Attribute::new(EMP, "deptno");
/// Active flag, stored as `Y`/`N`.
pub const EMP_ACTIVE: Attribute = Attribute::new(EMP, "active");
/// Photo.
pub const EMP_PHOTO: Attribute = Attribute::new(EMP, "photo");
/// Name and job, derived.
pub const EMP_LABEL: Attribute = Attribute::new(EMP, "label");
const EMP_DEPT_REFS: &[Reference] = &[Reference::new(EMP_DEPT, DEPT_ID)];
/// Employee to department.
pub const EMP_DEPT_FK: ForeignKey = ForeignKey::new(EMP, "dept_fk", DEPT, EMP_DEPT_REFS);
const EMP_MGR_REFS: &[Reference] = &[Reference::new(EMP_MGR, EMP_ID)];
/// Employee to manager.
pub const EMP_MGR_FK: ForeignKey = ForeignKey::new(EMP, "mgr_fk", EMP, EMP_MGR_REFS);

/// Master row with a two column key.
pub const MASTER: EntityType = EntityType::new("master");
/// First key column.
pub const MASTER_ID: Attribute = Attribute::new(MASTER, "id");
/// Second key column.
pub const MASTER_LINE: Attribute = Attribute::new(MASTER, "line");
/// Name.
pub const MASTER_NAME: Attribute = Attribute::new(MASTER, "name");

/// Detail row referencing a master.
pub const DETAIL: EntityType = EntityType::new("detail");
/// Detail id.
pub const DETAIL_ID: Attribute = Attribute::new(DETAIL, "id");
/// Master id column.
pub const DETAIL_MASTER_ID: Attribute = Attribute::new(DETAIL, "master_id");
/// Master line column.
pub const DETAIL_MASTER_LINE: Attribute = Attribute::new(DETAIL, "master_line");
/// Note.
pub const DETAIL_NOTE: Attribute = Attribute::new(DETAIL, "note");
const DETAIL_MASTER_REFS: &[Reference] = &[
    Reference::new(DETAIL_MASTER_ID, MASTER_ID),
    Reference::new(DETAIL_MASTER_LINE, MASTER_LINE),
];
/// Detail to master.
pub const DETAIL_MASTER_FK: ForeignKey = ForeignKey::new(DETAIL, "master_fk", MASTER, DETAIL_MASTER_REFS);

/// Read-only view of departments with their city.
pub const DEPT_VIEW: EntityType = EntityType::new("dept_view");
/// Department number.
pub const DEPT_VIEW_ID: Attribute = Attribute::new(DEPT_VIEW, "deptno");
/// Department name.
pub const DEPT_VIEW_NAME: Attribute = Attribute::new(DEPT_VIEW, "dname");
/// City.
pub const DEPT_VIEW_CITY: Attribute = Attribute::new(DEPT_VIEW, "city");

/// Employees joined with their department through a custom query.
pub const EMP_DETAILS: EntityType = EntityType::new("emp_details");
/// Employee number.
pub const EMP_DETAILS_ID: Attribute = Attribute::new(EMP_DETAILS, "empno");
/// Employee name.
pub const EMP_DETAILS_NAME: Attribute = Attribute::new(EMP_DETAILS, "ename");
/// Department name.
pub const EMP_DETAILS_DEPT_NAME: Attribute = Attribute::new(EMP_DETAILS, "dname");

/// Salary statistics per job, a grouped query.
pub const JOB_STATS: EntityType = EntityType::new("job_stats");
/// Job title.
pub const JOB_STATS_JOB: Attribute = Attribute::new(JOB_STATS, "job");
/// Highest salary.
pub const JOB_STATS_MAX_SAL: Attribute = Attribute::new(JOB_STATS, "max_sal");
/// Number of employees.
pub const JOB_STATS_COUNT: Attribute = Attribute::new(JOB_STATS, "employees");

/// Table, view and demo row definitions.
pub const SCHEMA: &str = "
create table location(
    locno integer primary key autoincrement,
    city text not null
);
create table dept(
    deptno integer primary key,
    dname text not null,
    locno integer references location(locno)
);
create table emp(
    empno integer primary key,
    ename text not null,
    job text,
    mgr integer references emp(empno),
    hiredate text,
    sal real,
    comm real,
    deptno integer references dept(deptno),
    active text not null default 'Y',
    photo blob
);
create table master(
    id integer not null,
    line integer not null,
    name text,
    primary key(id, line)
);
create table detail(
    id integer primary key,
    master_id integer,
    master_line integer,
    note text,
    foreign key(master_id, master_line) references master(id, line)
);
create view dept_view as
    select d.deptno, d.dname, l.city from dept d left join location l on l.locno = d.locno;
";

/// Demo rows.
pub const DEMO_DATA: &str = "
insert into location(locno, city) values(1, 'DALLAS');
insert into location(locno, city) values(2, 'NEW YORK');
insert into location(locno, city) values(3, 'CHICAGO');
insert into location(locno, city) values(4, 'BOSTON');
insert into dept values(10, 'ACCOUNTING', 2);
insert into dept values(20, 'RESEARCH', 1);
insert into dept values(30, 'SALES', 3);
insert into dept values(40, 'OPERATIONS', 4);
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7839, 'KING', 'PRESIDENT', null, '1981-11-17', 5000, null, 10, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7566, 'JONES', 'MANAGER', 7839, '1981-04-02', 2975, null, 20, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7698, 'BLAKE', 'MANAGER', 7839, '1981-05-01', 2850, null, 30, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7782, 'CLARK', 'MANAGER', 7839, '1981-06-09', 2450, null, 10, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7788, 'SCOTT', 'ANALYST', 7566, '1987-04-19', 3000, null, 20, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7369, 'SMITH', 'CLERK', 7788, '1980-12-17', 800, null, 20, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7499, 'ALLEN', 'SALESMAN', 7698, '1981-02-20', 1600, 300, 30, 'Y');
insert into emp(empno, ename, job, mgr, hiredate, sal, comm, deptno, active)
    values(7521, 'WARD', 'SALESMAN', 7698, '1981-02-22', 1250, 500, 30, 'N');
insert into master values(1, 1, 'first');
insert into master values(1, 2, 'second');
insert into detail values(1, 1, 1, 'a');
insert into detail values(2, 1, 2, 'b');
insert into detail values(3, 1, 2, 'c');
";

/// Number of employees in [`DEMO_DATA`].
pub const DEMO_EMPLOYEES: usize = 8;

/// Creates the demo tables, and fills them when `with_data` is set.
///
/// # Errors
///
/// Returns an error if a statement fails, for example because the tables
/// already exist.
pub fn install(connection: &mut SqliteConnection, with_data: bool) -> DbResult<()> {
    connection.execute_batch(SCHEMA)?;
    if with_data {
        connection.execute_batch(DEMO_DATA)?;
    }
    Ok(())
}

/// Builds the demo domain.
///
/// # Errors
///
/// Returns an error if the definitions are inconsistent.
pub fn entities() -> DomainResult<Entities> {
    Entities::builder("scott")
        .add(location())
        .add(dept())
        .add(emp())
        .add(master())
        .add(detail())
        .add(dept_view())
        .add(emp_details())
        .add(job_stats())
        .build()
}

fn location() -> EntityDefinition {
    EntityDefinition::builder(LOCATION, "location")
        .column(ColumnDefinition::primary_key(LOCATION_ID, ValueType::Integer))
        .column(ColumnDefinition::new(LOCATION_CITY, ValueType::String).nullable(false))
        .key_generator(AutomaticKeyGenerator::new("location"))
        .order_by(OrderBy::ascending(&[LOCATION_CITY]))
        .build()
}

fn dept() -> EntityDefinition {
    EntityDefinition::builder(DEPT, "dept")
        .column(ColumnDefinition::primary_key(DEPT_ID, ValueType::Integer))
        .column(ColumnDefinition::new(DEPT_NAME, ValueType::String).nullable(false))
        .column(ColumnDefinition::new(DEPT_LOCATION, ValueType::Integer))
        .foreign_key(ForeignKeyDefinition::new(DEPT_LOCATION_FK))
        .order_by(OrderBy::ascending(&[DEPT_NAME]))
        .build()
}

fn emp() -> EntityDefinition {
    EntityDefinition::builder(EMP, "emp")
        .column(ColumnDefinition::primary_key(EMP_ID, ValueType::Integer))
        .column(ColumnDefinition::new(EMP_NAME, ValueType::String).nullable(false))
        .column(ColumnDefinition::new(EMP_JOB, ValueType::String))
        .column(ColumnDefinition::new(EMP_MGR, ValueType::Integer))
        .column(ColumnDefinition::new(EMP_HIREDATE, ValueType::Date))
        .column(ColumnDefinition::new(EMP_SAL, ValueType::Decimal { scale: 2 }))
        .column(ColumnDefinition::new(EMP_COMM, ValueType::Decimal { scale: 2 }))
        .column(ColumnDefinition::new(EMP_DEPT, ValueType::Integer))
        .column(ColumnDefinition::new(EMP_ACTIVE, ValueType::Boolean).converter(BooleanConverter::new("Y", "N")))
        .column(ColumnDefinition::new(EMP_PHOTO, ValueType::Blob))
        .foreign_key(ForeignKeyDefinition::new(EMP_DEPT_FK))
        .foreign_key(ForeignKeyDefinition::new(EMP_MGR_FK))
        .derived(DerivedDefinition::new(
            EMP_LABEL,
            ValueType::String,
            vec![EMP_NAME, EMP_JOB],
            |entity| match (entity.value(&EMP_NAME).as_str(), entity.value(&EMP_JOB).as_str()) {
                (Some(name), Some(job)) => Value::from(format!("{name} ({job})")),
                (Some(name), None) => Value::from(name),
                _ => Value::Null,
            },
        ))
        .order_by(OrderBy::ascending(&[EMP_DEPT]).then_descending(&[EMP_SAL]))
        .build()
}

fn master() -> EntityDefinition {
    EntityDefinition::builder(MASTER, "master")
        .column(ColumnDefinition::primary_key(MASTER_ID, ValueType::Integer))
        .column(ColumnDefinition::new(MASTER_LINE, ValueType::Integer).primary_key_index(1))
        .column(ColumnDefinition::new(MASTER_NAME, ValueType::String))
        .build()
}

fn detail() -> EntityDefinition {
    EntityDefinition::builder(DETAIL, "detail")
        .column(ColumnDefinition::primary_key(DETAIL_ID, ValueType::Integer))
        .column(ColumnDefinition::new(DETAIL_MASTER_ID, ValueType::Integer))
        .column(ColumnDefinition::new(DETAIL_MASTER_LINE, ValueType::Integer))
        .column(ColumnDefinition::new(DETAIL_NOTE, ValueType::String))
        .foreign_key(ForeignKeyDefinition::new(DETAIL_MASTER_FK))
        .build()
}

fn dept_view() -> EntityDefinition {
    EntityDefinition::builder(DEPT_VIEW, "dept_view")
        .column(ColumnDefinition::primary_key(DEPT_VIEW_ID, ValueType::Integer))
        .column(ColumnDefinition::new(DEPT_VIEW_NAME, ValueType::String))
        .column(ColumnDefinition::new(DEPT_VIEW_CITY, ValueType::String))
        .read_only(true)
        .build()
}

fn emp_details() -> EntityDefinition {
    EntityDefinition::builder(EMP_DETAILS, "emp")
        .column(ColumnDefinition::primary_key(EMP_DETAILS_ID, ValueType::Integer).expression("e.empno"))
        .column(ColumnDefinition::new(EMP_DETAILS_NAME, ValueType::String).expression("e.ename"))
        .column(ColumnDefinition::new(EMP_DETAILS_DEPT_NAME, ValueType::String).expression("d.dname"))
        .select_query(SelectQuery::new(
            "select e.empno, e.ename, d.dname from emp e join dept d on d.deptno = e.deptno",
            false,
        ))
        .order_by(OrderBy::ascending(&[EMP_DETAILS_NAME]))
        .read_only(true)
        .build()
}

fn job_stats() -> EntityDefinition {
    EntityDefinition::builder(JOB_STATS, "emp")
        .column(ColumnDefinition::new(JOB_STATS_JOB, ValueType::String).grouping())
        .column(
            ColumnDefinition::new(JOB_STATS_MAX_SAL, ValueType::Decimal { scale: 2 })
                .expression("max(sal)")
                .aggregate(),
        )
        .column(
            ColumnDefinition::new(JOB_STATS_COUNT, ValueType::Integer)
                .expression("count(*)")
                .aggregate(),
        )
        .order_by(OrderBy::ascending(&[JOB_STATS_JOB]))
        .read_only(true)
        .build()
}

//! Selects over the special shapes of the demo domain.

use entisql_core::{EntityConnection, EntityError, EntityResult, Functions, LocalEntityConnection};
use entisql_db::SqliteConnection;
use entisql_domain::condition::{self, column, foreign_key, Condition, OrderBy, Select, Update};
use entisql_domain::Value;
use entisql_testkit::prelude::*;

#[test]
fn composite_foreign_keys_resolve() {
    let db = TestDatabase::memory();
    let details = db
        .select(&Select::all(DETAIL).order_by(OrderBy::ascending(&[DETAIL_ID])))
        .unwrap();
    assert_eq!(details.len(), 3);
    let first = details[0].referenced(&DETAIL_MASTER_FK).unwrap();
    assert_eq!(first.value(&MASTER_NAME), Value::from("first"));
    let second = details[2].referenced(&DETAIL_MASTER_FK).unwrap();
    assert_eq!(second.value(&MASTER_NAME), Value::from("second"));

    let master = second.clone();
    let condition = foreign_key(&DETAIL_MASTER_FK).equal_to(Some(&master));
    assert_eq!(
        condition.to_sql(db.entities().definition(&DETAIL).unwrap()).unwrap(),
        "(master_id = ? and master_line = ?)"
    );
    assert_eq!(db.row_count(&condition).unwrap(), 2);

    let dependencies = db.dependencies(&[master]).unwrap();
    assert_eq!(dependencies[&DETAIL].len(), 2);
}

#[test]
fn custom_select_queries_take_conditions_and_counts() {
    let db = TestDatabase::memory();
    let research = db
        .select_where(&column(&EMP_DETAILS_DEPT_NAME).equal_to("RESEARCH"))
        .unwrap();
    let names: Vec<Value> = research.iter().map(|e| e.value(&EMP_DETAILS_NAME)).collect();
    assert_eq!(names, vec![Value::from("JONES"), Value::from("SCOTT"), Value::from("SMITH")]);

    assert_eq!(db.row_count(&condition::all(EMP_DETAILS)).unwrap(), DEMO_EMPLOYEES);
    assert_eq!(
        db.row_count(&column(&EMP_DETAILS_NAME).like("S%")).unwrap(),
        2
    );
    assert!(matches!(
        db.select_values(&EMP_DETAILS_NAME, &condition::all(EMP_DETAILS)),
        Err(EntityError::Unsupported(_))
    ));
    assert!(matches!(
        db.delete_where(&condition::all(EMP_DETAILS)),
        Err(EntityError::ReadOnlyViolation(_))
    ));
}

#[test]
fn grouped_queries() {
    let db = TestDatabase::memory();
    let stats = db.select(&Select::all(JOB_STATS)).unwrap();
    assert_eq!(stats.len(), 5);
    let managers = stats
        .iter()
        .find(|s| s.value(&JOB_STATS_JOB) == Value::from("MANAGER"))
        .unwrap();
    assert_eq!(managers.value(&JOB_STATS_MAX_SAL), Value::Double(2975.0));
    assert_eq!(managers.value(&JOB_STATS_COUNT), Value::from(3));

    assert_eq!(db.row_count(&condition::all(JOB_STATS)).unwrap(), 5);
    let salesmen = column(&JOB_STATS_JOB).equal_to("SALESMAN");
    assert_eq!(db.row_count(&salesmen).unwrap(), 1);
}

#[test]
fn views_select_like_tables() {
    let db = TestDatabase::memory();
    let view = db
        .select_single(&Select::where_(column(&DEPT_VIEW_ID).equal_to(30)))
        .unwrap();
    assert_eq!(view.value(&DEPT_VIEW_CITY), Value::from("CHICAGO"));
    assert_eq!(
        db.select_values(&DEPT_VIEW_CITY, &condition::all(DEPT_VIEW)).unwrap(),
        vec![
            Value::from("BOSTON"),
            Value::from("CHICAGO"),
            Value::from("DALLAS"),
            Value::from("NEW YORK")
        ]
    );
}

#[test]
fn converters_apply_to_values_and_conditions() {
    let db = TestDatabase::memory();
    let inactive = db.select_where(&column(&EMP_ACTIVE).equal_to(false)).unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].value(&EMP_NAME), Value::from("WARD"));
    assert_eq!(inactive[0].value(&EMP_ACTIVE), Value::Bool(false));

    let mut ward = inactive[0].clone();
    ward.put(&EMP_ACTIVE, true).unwrap();
    let stored = db.update_one(&ward).unwrap();
    assert_eq!(stored.value(&EMP_ACTIVE), Value::Bool(true));
    assert_eq!(db.row_count(&column(&EMP_ACTIVE).equal_to(true)).unwrap(), DEMO_EMPLOYEES);

    let update = Update::where_(column(&EMP_JOB).equal_to("CLERK"))
        .set(&EMP_ACTIVE, false)
        .build()
        .unwrap();
    assert_eq!(db.update_where(&update).unwrap(), 1);
    let smith = db.select_by_key(&db.key(&EMP, 7369)).unwrap();
    assert_eq!(smith.value(&EMP_ACTIVE), Value::Bool(false));
}

#[test]
fn ignore_case_and_null_conditions() {
    let db = TestDatabase::memory();
    assert_eq!(db.row_count(&column(&EMP_NAME).equal_to_ignore_case("king")).unwrap(), 1);
    assert_eq!(db.row_count(&column(&EMP_NAME).like_ignore_case("%a%")).unwrap(), 4);
    assert_eq!(db.row_count(&column(&EMP_MGR).equal_to(Value::Null)).unwrap(), 1);
    assert_eq!(db.row_count(&column(&EMP_COMM).is_not_null()).unwrap(), 2);
    let between = column(&EMP_SAL).between(1250.0, 2000.0).unwrap();
    assert_eq!(db.row_count(&between).unwrap(), 2);
    let either = condition::or([
        column(&EMP_JOB).equal_to("PRESIDENT"),
        column(&EMP_DEPT).equal_to(30),
    ])
    .unwrap();
    assert_eq!(db.row_count(&either).unwrap(), 4);
}

#[test]
fn custom_conditions_bind_through_columns() {
    let db = TestDatabase::memory();
    let recent = condition::custom(
        EMP,
        "hiredate >= ? and active = ?",
        vec![EMP_HIREDATE, EMP_ACTIVE],
        vec![Value::from("1981-05-01"), Value::from(true)],
    )
    .unwrap();
    let names: Vec<Value> = db
        .select(&Select::where_(recent).order_by(OrderBy::ascending(&[EMP_NAME])))
        .unwrap()
        .iter()
        .map(|e| e.value(&EMP_NAME))
        .collect();
    assert_eq!(
        names,
        vec![
            Value::from("BLAKE"),
            Value::from("CLARK"),
            Value::from("KING"),
            Value::from("SCOTT")
        ]
    );
}

#[test]
fn conditions_cross_a_serialization_boundary() {
    let db = TestDatabase::memory();
    let condition = condition::and([
        column(&EMP_DEPT).in_values([20, 30]),
        column(&EMP_SAL).greater_than(1500.0),
    ])
    .unwrap();
    let json = serde_json::to_string(&condition).unwrap();
    let received: Condition = serde_json::from_str(&json).unwrap();
    assert_eq!(received, condition);
    assert_eq!(db.row_count(&received).unwrap(), db.row_count(&condition).unwrap());
    assert_eq!(db.row_count(&received).unwrap(), 4);
}

#[test]
fn dependencies_of_departments_and_managers() {
    let db = TestDatabase::memory();
    let sales = db.select_by_key(&db.key(&DEPT, 30)).unwrap();
    let operations = db.select_by_key(&db.key(&DEPT, 40)).unwrap();
    let dependencies = db.dependencies(&[sales, operations.clone()]).unwrap();
    assert_eq!(dependencies[&EMP].len(), 3);
    assert!(db.dependencies(&[operations]).unwrap().is_empty());

    let king = db.select_by_key(&db.key(&EMP, 7839)).unwrap();
    let reports = &db.dependencies(&[king]).unwrap()[&EMP];
    assert_eq!(reports.len(), 3);
}

#[test]
fn photos_are_read_and_written_separately() {
    let db = TestDatabase::memory();
    let scott = db.key(&EMP, 7788);
    let photo: Vec<u8> = (0..=255).collect();
    db.write_blob(&scott, &EMP_PHOTO, &photo).unwrap();
    assert_eq!(db.read_blob(&scott, &EMP_PHOTO).unwrap(), Some(photo));

    let selected = db.select_by_key(&scott).unwrap();
    assert!(!selected.contains(&EMP_PHOTO));

    let eager = Select::where_(condition::key(&scott)).attributes(vec![EMP_NAME, EMP_PHOTO]);
    let with_photo = db.select_single(&eager).unwrap();
    assert_eq!(with_photo.value(&EMP_PHOTO).as_bytes().map(<[u8]>::len), Some(256));
}

#[test]
fn generated_location_keys() {
    let db = TestDatabase::memory();
    let denver = db
        .entities()
        .entity(&LOCATION)
        .unwrap()
        .with(&LOCATION_CITY, "DENVER")
        .build()
        .unwrap();
    let stored = db.insert_select(&[denver]).unwrap();
    assert_eq!(stored[0].key(), db.key(&LOCATION, 5));

    let cities: Vec<Value> = db
        .select(&Select::all(LOCATION))
        .unwrap()
        .iter()
        .map(|l| l.value(&LOCATION_CITY))
        .collect();
    assert_eq!(cities.first(), Some(&Value::from("BOSTON")));
    assert_eq!(cities.len(), 5);
}

#[test]
fn functions_share_the_transaction() {
    let entities = demo_entities();
    let mut sqlite = SqliteConnection::open_in_memory().unwrap();
    install(&mut sqlite, true).unwrap();
    let functions = Functions::new()
        .function(
            "payroll",
            |connection: &dyn EntityConnection, arguments: &[Value]| -> EntityResult<Value> {
                let department = column(&EMP_DEPT).equal_to(arguments[0].clone());
                let total: f64 = connection
                    .select_values(&EMP_SAL, &department)?
                    .iter()
                    .filter_map(Value::as_f64)
                    .fold(0.0, |total, salary| total + salary);
                Ok(Value::from(total))
            },
        )
        .procedure(
            "transfer",
            |connection: &dyn EntityConnection, arguments: &[Value]| -> EntityResult<()> {
                let update = Update::where_(column(&EMP_ID).equal_to(arguments[0].clone()))
                    .set(&EMP_DEPT, arguments[1].clone())
                    .build()?;
                connection.update_where(&update)?;
                Ok(())
            },
        );
    let connection = LocalEntityConnection::new(entities, sqlite).functions(functions);

    assert_eq!(
        connection.execute_function("payroll", &[Value::from(10)]).unwrap(),
        Value::from(7450.0)
    );
    connection.begin_transaction().unwrap();
    connection
        .execute_procedure("transfer", &[Value::from(7782), Value::from(40)])
        .unwrap();
    assert_eq!(
        connection.execute_function("payroll", &[Value::from(40)]).unwrap(),
        Value::from(2450.0)
    );
    connection.rollback_transaction().unwrap();
    assert_eq!(
        connection.execute_function("payroll", &[Value::from(40)]).unwrap(),
        Value::from(0.0)
    );
}

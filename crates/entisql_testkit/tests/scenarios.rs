//! End-to-end scenarios over the demo domain.

use entisql_core::{EntityConnection, EntityError};
use entisql_domain::condition::{self, column, Select};
use entisql_domain::{Entity, Value};
use entisql_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn insert_into_read_only_type_fails_before_any_statement() {
    let db = TestDatabase::memory();
    let view = db
        .entities()
        .entity(&DEPT_VIEW)
        .unwrap()
        .with(&DEPT_VIEW_ID, 50)
        .with(&DEPT_VIEW_NAME, "NEW")
        .build()
        .unwrap();
    assert!(matches!(db.insert(&[view]), Err(EntityError::ReadOnlyViolation(_))));
    assert!(!db.is_transaction_open());
    assert_eq!(db.row_count(&condition::all(DEPT)).unwrap(), 4);
}

#[test]
fn concurrent_modification_fails_with_both_versions() {
    let db = TestDatabase::file();
    let other = db.connect();

    let mut mine = db.select_by_key(&db.key(&EMP, 7788)).unwrap();
    let mut theirs = other.select_by_key(&db.key(&EMP, 7788)).unwrap();
    theirs.put(&EMP_SAL, 3300.0).unwrap();
    other.update_one(&theirs).unwrap();

    mine.put(&EMP_JOB, "LEAD").unwrap();
    match db.update(&[mine.clone()]) {
        Err(EntityError::RecordModified { entity, current }) => {
            assert_eq!(entity.value(&EMP_JOB), Value::from("LEAD"));
            let current = current.expect("row still exists");
            assert_eq!(current.value(&EMP_SAL), Value::Double(3300.0));
            assert_eq!(current.value(&EMP_JOB), Value::from("ANALYST"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!db.is_transaction_open());
    let stored = db.select_by_key(&db.key(&EMP, 7788)).unwrap();
    assert_eq!(stored.value(&EMP_JOB), Value::from("ANALYST"));
}

#[test]
fn modification_inside_an_explicit_transaction_rolls_back_with_it() {
    let db = TestDatabase::file();
    let other = db.connect();

    let mut smith = db.select_by_key(&db.key(&EMP, 7369)).unwrap();
    let mut ward = db.select_by_key(&db.key(&EMP, 7521)).unwrap();
    let mut changed = other.select_by_key(&db.key(&EMP, 7521)).unwrap();
    changed.put(&EMP_COMM, 0.0).unwrap();
    other.update_one(&changed).unwrap();

    db.begin_transaction().unwrap();
    smith.put(&EMP_SAL, 900.0).unwrap();
    db.update_one(&smith).unwrap();
    ward.put(&EMP_SAL, 1300.0).unwrap();
    assert!(matches!(db.update_one(&ward), Err(EntityError::RecordModified { .. })));
    assert!(db.is_transaction_open());
    db.rollback_transaction().unwrap();

    let smith = db.select_by_key(&db.key(&EMP, 7369)).unwrap();
    assert_eq!(smith.value(&EMP_SAL), Value::Double(800.0));
}

#[test]
fn fetch_depth_one_leaves_the_location_as_a_placeholder() {
    let db = TestDatabase::memory();
    let scott = db.select_by_key(&db.key(&EMP, 7788)).unwrap();

    let research = scott.referenced(&EMP_DEPT_FK).expect("department is resolved");
    assert_eq!(research.value(&DEPT_NAME), Value::from("RESEARCH"));
    let dallas = research.referenced(&DEPT_LOCATION_FK).expect("location placeholder");
    assert_eq!(dallas.key(), db.key(&LOCATION, 1));
    assert!(!dallas.contains(&LOCATION_CITY));

    let select = Select::where_(column(&EMP_ID).equal_to(7788)).fetch_depth(2);
    let scott = db.select_single(&select).unwrap();
    let dallas = scott
        .referenced(&EMP_DEPT_FK)
        .and_then(|dept| dept.referenced(&DEPT_LOCATION_FK))
        .unwrap();
    assert_eq!(dallas.value(&LOCATION_CITY), Value::from("DALLAS"));
}

#[test]
fn delete_matching_nothing_returns_zero() {
    let db = TestDatabase::memory();
    assert_eq!(db.delete_where(&column(&EMP_NAME).equal_to("NOBODY")).unwrap(), 0);
    assert_eq!(db.delete_keys(&[db.key(&EMP, 1)]).unwrap(), 0);
    assert_eq!(db.row_count(&condition::all(EMP)).unwrap(), DEMO_EMPLOYEES);
}

#[test]
fn referential_integrity_is_reported_with_a_translated_message() {
    let db = TestDatabase::memory();
    let error = db.delete_key(&db.key(&DEPT, 10)).unwrap_err();
    assert_eq!(error.to_string(), "Referential integrity constraint violation");
    match error {
        EntityError::Database { sql, values, .. } => {
            assert_eq!(sql.as_deref(), Some("delete from dept where deptno in (?)"));
            assert_eq!(values, vec![Value::from(10)]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn long_key_lists_are_chunked() {
    let db = TestDatabase::memory();
    let employees: Vec<Entity> = (0..250)
        .map(|offset| {
            db.entities()
                .entity(&EMP)
                .unwrap()
                .with(&EMP_ID, 20_000 + offset)
                .with(&EMP_NAME, format!("E{offset}"))
                .with(&EMP_DEPT, 40)
                .build()
                .unwrap()
        })
        .collect();
    let keys = db.insert(&employees).unwrap();
    assert_eq!(keys.len(), 250);

    let selected = db.select_keys(&keys).unwrap();
    assert_eq!(selected.len(), 250);
    assert_eq!(
        db.row_count(&column(&EMP_ID).in_values((20_000..20_250).map(Value::from))).unwrap(),
        250
    );
    assert_eq!(db.delete_keys(&keys).unwrap(), 250);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn inserted_employees_read_back_unchanged(employees in employees_strategy(6)) {
        let db = TestDatabase::memory();
        let entities: Vec<Entity> = employees
            .iter()
            .map(|employee| employee.to_entity(db.entities()).unwrap())
            .collect();
        let keys = db.insert(&entities).unwrap();
        prop_assert_eq!(keys.len(), entities.len());

        let definition = db.entities().definition(&EMP).unwrap();
        for (entity, key) in entities.iter().zip(&keys) {
            let stored = db.select_by_key(key).unwrap();
            for column in definition.selected_columns() {
                let expected = column.value_type().coerce(entity.value(column.attribute()));
                prop_assert_eq!(stored.value(column.attribute()), expected);
            }
            prop_assert_eq!(stored.value(&EMP_LABEL), entity.value(&EMP_LABEL));
        }
    }
}

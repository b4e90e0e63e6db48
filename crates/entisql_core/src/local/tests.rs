use super::*;
use crate::error::EntityResult;
use entisql_db::SqliteConnection;
use entisql_domain::condition::{all, OrderBy};
use entisql_domain::{AutomaticKeyGenerator, ForeignKey, ForeignKeyDefinition, Reference, ValueType};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const LOCATION: EntityType = EntityType::new("location");
const LOCATION_ID: Attribute = Attribute::new(LOCATION, "locno");
const LOCATION_CITY: Attribute = Attribute::new(LOCATION, "city");

const DEPT: EntityType = EntityType::new("dept");
const DEPT_ID: Attribute = Attribute::new(DEPT, "deptno");
const DEPT_NAME: Attribute = Attribute::new(DEPT, "dname");
const DEPT_LOCATION: Attribute = Attribute::new(DEPT, "locno");
const DEPT_LOCATION_REFS: &[Reference] = &[Reference::new(DEPT_LOCATION, LOCATION_ID)];
const DEPT_LOCATION_FK: ForeignKey = ForeignKey::new(DEPT, "location_fk", LOCATION, DEPT_LOCATION_REFS);

const EMP: EntityType = EntityType::new("emp");
const EMP_ID: Attribute = Attribute::new(EMP, "empno");
const EMP_NAME: Attribute = Attribute::new(EMP, "ename");
const EMP_SAL: Attribute = Attribute::new(EMP, "sal");
const EMP_DEPT: Attribute = Attribute::new(EMP, "deptno");
const EMP_MGR: Attribute = Attribute::new(EMP, "mgr");
const EMP_PHOTO: Attribute = Attribute::new(EMP, "photo");
const EMP_DEPT_REFS: &[Reference] = &[Reference::new(EMP_DEPT, DEPT_ID)];
const EMP_DEPT_FK: ForeignKey = ForeignKey::new(EMP, "dept_fk", DEPT, EMP_DEPT_REFS);
const EMP_MGR_REFS: &[Reference] = &[Reference::new(EMP_MGR, EMP_ID)];
const EMP_MGR_FK: ForeignKey = ForeignKey::new(EMP, "mgr_fk", EMP, EMP_MGR_REFS);

const DEPT_VIEW: EntityType = EntityType::new("dept_view");
const DEPT_VIEW_ID: Attribute = Attribute::new(DEPT_VIEW, "deptno");
const DEPT_VIEW_NAME: Attribute = Attribute::new(DEPT_VIEW, "dname");

const SCHEMA: &str = "
    create table location(locno integer primary key, city text not null);
    create table dept(deptno integer primary key, dname text not null, locno integer references location(locno));
    create table emp(
        empno integer primary key,
        ename text not null,
        sal real,
        deptno integer references dept(deptno),
        mgr integer references emp(empno),
        photo blob
    );
    insert into location values(1, 'DALLAS');
    insert into dept values(10, 'ACCOUNTING', 1);
    insert into dept values(20, 'RESEARCH', 1);
    insert into emp(empno, ename, sal, deptno, mgr) values(1, 'KING', 5000, 10, null);
    insert into emp(empno, ename, sal, deptno, mgr) values(2, 'JONES', 2975, 20, 1);
    insert into emp(empno, ename, sal, deptno, mgr) values(3, 'SCOTT', 3000, 20, 2);
";

fn domain() -> Arc<Entities> {
    Arc::new(
        Entities::builder("scott")
            .add(
                EntityDefinition::builder(LOCATION, "location")
                    .column(ColumnDefinition::primary_key(LOCATION_ID, ValueType::Integer))
                    .column(ColumnDefinition::new(LOCATION_CITY, ValueType::String))
                    .key_generator(AutomaticKeyGenerator::new("location"))
                    .build(),
            )
            .add(
                EntityDefinition::builder(DEPT, "dept")
                    .column(ColumnDefinition::primary_key(DEPT_ID, ValueType::Integer))
                    .column(ColumnDefinition::new(DEPT_NAME, ValueType::String))
                    .column(ColumnDefinition::new(DEPT_LOCATION, ValueType::Integer))
                    .foreign_key(ForeignKeyDefinition::new(DEPT_LOCATION_FK))
                    .build(),
            )
            .add(
                EntityDefinition::builder(EMP, "emp")
                    .column(ColumnDefinition::primary_key(EMP_ID, ValueType::Integer))
                    .column(ColumnDefinition::new(EMP_NAME, ValueType::String))
                    .column(ColumnDefinition::new(EMP_SAL, ValueType::Decimal { scale: 2 }))
                    .column(ColumnDefinition::new(EMP_DEPT, ValueType::Integer))
                    .column(ColumnDefinition::new(EMP_MGR, ValueType::Integer))
                    .column(ColumnDefinition::new(EMP_PHOTO, ValueType::Blob))
                    .foreign_key(ForeignKeyDefinition::new(EMP_DEPT_FK))
                    .foreign_key(ForeignKeyDefinition::new(EMP_MGR_FK))
                    .build(),
            )
            .add(
                EntityDefinition::builder(DEPT_VIEW, "dept")
                    .column(ColumnDefinition::primary_key(DEPT_VIEW_ID, ValueType::Integer))
                    .column(ColumnDefinition::new(DEPT_VIEW_NAME, ValueType::String))
                    .read_only(true)
                    .build(),
            )
            .build()
            .unwrap(),
    )
}

fn connection() -> LocalEntityConnection {
    connection_with(Config::default())
}

fn connection_with(config: Config) -> LocalEntityConnection {
    let mut sqlite = SqliteConnection::open_in_memory().unwrap();
    sqlite.execute_batch(SCHEMA).unwrap();
    LocalEntityConnection::with_config(domain(), sqlite, config)
}

fn key(connection: &LocalEntityConnection, entity_type: &EntityType, id: i64) -> Key {
    connection
        .entities()
        .primary_key(entity_type, vec![Value::from(id)])
        .unwrap()
}

fn emp(connection: &LocalEntityConnection, id: i64) -> Entity {
    connection.select_by_key(&key(connection, &EMP, id)).unwrap()
}

#[test]
fn select_resolves_one_level_by_default() {
    let connection = connection();
    let scott = emp(&connection, 3);
    assert_eq!(scott.value(&EMP_SAL), Value::Double(3000.0));
    assert!(!scott.contains(&EMP_PHOTO));

    let dept = scott.referenced(&EMP_DEPT_FK).unwrap();
    assert_eq!(dept.value(&DEPT_NAME), Value::from("RESEARCH"));
    let location = dept.referenced(&DEPT_LOCATION_FK).unwrap();
    assert_eq!(location.key(), key(&connection, &LOCATION, 1));
    assert!(!location.contains(&LOCATION_CITY));

    let jones = scott.referenced(&EMP_MGR_FK).unwrap();
    assert_eq!(jones.value(&EMP_NAME), Value::from("JONES"));
    assert!(!jones.referenced(&EMP_MGR_FK).unwrap().contains(&EMP_NAME));

    let king = emp(&connection, 1);
    assert!(king.is_loaded(&EMP_MGR_FK));
    assert!(king.referenced(&EMP_MGR_FK).is_none());
}

#[test]
fn fetch_depth_overrides() {
    let connection = connection();
    let condition = column(&EMP_ID).equal_to(3);

    let select = Select::where_(condition.clone()).fetch_depth_for(EMP_MGR_FK.attribute(), 2);
    let scott = connection.select_single(&select).unwrap();
    let jones = scott.referenced(&EMP_MGR_FK).unwrap();
    let king = jones.referenced(&EMP_MGR_FK).unwrap();
    assert_eq!(king.value(&EMP_NAME), Value::from("KING"));
    assert!(!scott.referenced(&EMP_DEPT_FK).unwrap().referenced(&DEPT_LOCATION_FK).unwrap().contains(&LOCATION_CITY));

    let select = Select::where_(condition).fetch_depth(0);
    let scott = connection.select_single(&select).unwrap();
    let dept = scott.referenced(&EMP_DEPT_FK).unwrap();
    assert_eq!(dept.key(), key(&connection, &DEPT, 20));
    assert!(!dept.contains(&DEPT_NAME));
}

/// Runs `resolve` on its own thread and fails if it does not finish in time.
fn finishes<T: Send + 'static>(resolve: impl FnOnce() -> T + Send + 'static) -> T {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let _ = sender.send(resolve());
    });
    receiver
        .recv_timeout(Duration::from_secs(10))
        .expect("select with unlimited fetch depth did not finish")
}

#[test]
fn unlimited_fetch_depth_stops_on_cycles() {
    let (names, king_manager, scott_key, city) = finishes(|| {
        let connection = connection();
        let update = Update::where_(column(&EMP_ID).equal_to(1)).set(&EMP_MGR, 3).build().unwrap();
        assert_eq!(connection.update_where(&update).unwrap(), 1);

        connection.set_limit_fetch_depth(false);
        let scott = emp(&connection, 3);
        let jones = scott.referenced(&EMP_MGR_FK).unwrap();
        let king = jones.referenced(&EMP_MGR_FK).unwrap();
        let location = king
            .referenced(&EMP_DEPT_FK)
            .unwrap()
            .referenced(&DEPT_LOCATION_FK)
            .unwrap();
        (
            vec![jones.value(&EMP_NAME), king.value(&EMP_NAME)],
            king.referenced(&EMP_MGR_FK).unwrap().key(),
            scott.key(),
            location.value(&LOCATION_CITY),
        )
    });
    assert_eq!(names, vec![Value::from("JONES"), Value::from("KING")]);
    assert_eq!(king_manager, scott_key);
    assert_eq!(city, Value::from("DALLAS"));
}

#[test]
fn unlimited_fetch_depth_stops_on_null_references() {
    let (loaded, manager, city) = finishes(|| {
        let connection = connection();
        connection.set_limit_fetch_depth(false);
        let king = emp(&connection, 1);
        let location = king
            .referenced(&EMP_DEPT_FK)
            .unwrap()
            .referenced(&DEPT_LOCATION_FK)
            .unwrap();
        (
            king.is_loaded(&EMP_MGR_FK),
            king.referenced(&EMP_MGR_FK).map(Entity::key),
            location.value(&LOCATION_CITY),
        )
    });
    assert!(loaded);
    assert_eq!(manager, None);
    assert_eq!(city, Value::from("DALLAS"));
}

#[test]
fn unlimited_fetch_depth_follows_self_references_to_the_end() {
    let (names, top_manager_loaded, cities) = finishes(|| {
        let connection = connection_with(Config::new().limit_fetch_depth(false));
        let scott = emp(&connection, 3);
        let jones = scott.referenced(&EMP_MGR_FK).unwrap();
        let king = jones.referenced(&EMP_MGR_FK).unwrap();
        let cities: Vec<Value> = [&scott, jones, king]
            .iter()
            .map(|e| {
                e.referenced(&EMP_DEPT_FK)
                    .and_then(|dept| dept.referenced(&DEPT_LOCATION_FK))
                    .map(|location| location.value(&LOCATION_CITY))
                    .unwrap_or_default()
            })
            .collect();
        (
            vec![scott.value(&EMP_NAME), jones.value(&EMP_NAME), king.value(&EMP_NAME)],
            king.is_loaded(&EMP_MGR_FK) && king.referenced(&EMP_MGR_FK).is_none(),
            cities,
        )
    });
    assert_eq!(names, vec![Value::from("SCOTT"), Value::from("JONES"), Value::from("KING")]);
    assert!(top_manager_loaded);
    assert_eq!(cities, vec![Value::from("DALLAS"); 3]);
}

#[test]
fn max_fetch_depth_caps_unlimited_resolution() {
    let connection = connection_with(Config::new().limit_fetch_depth(false).max_fetch_depth(Some(1)));
    let scott = emp(&connection, 3);
    let jones = scott.referenced(&EMP_MGR_FK).unwrap();
    assert!(jones.contains(&EMP_NAME));
    assert!(!jones.referenced(&EMP_MGR_FK).unwrap().contains(&EMP_NAME));
}

#[test]
fn for_update_selects_attach_placeholders() {
    let connection = connection();
    let select = Select::where_(column(&EMP_ID).equal_to(3)).for_update();
    let scott = connection.select_single(&select).unwrap();
    let dept = scott.referenced(&EMP_DEPT_FK).unwrap();
    assert_eq!(dept.key(), key(&connection, &DEPT, 20));
    assert!(!dept.contains(&DEPT_NAME));
}

#[test]
fn attribute_subsets() {
    let connection = connection();
    let select = Select::where_(column(&EMP_ID).equal_to(3)).attributes(vec![EMP_NAME]);
    let scott = connection.select_single(&select).unwrap();
    assert!(scott.contains(&EMP_ID));
    assert!(scott.contains(&EMP_NAME));
    assert!(!scott.contains(&EMP_SAL));
    assert!(scott.referenced(&EMP_DEPT_FK).is_none());
    assert!(!scott.is_loaded(&EMP_DEPT_FK));
    assert!(!scott.is_loaded(&EMP_MGR_FK));

    let select = Select::where_(column(&EMP_ID).equal_to(3)).attributes(vec![EMP_DEPT_FK.attribute().clone()]);
    let scott = connection.select_single(&select).unwrap();
    assert_eq!(scott.value(&EMP_DEPT), Value::from(20));
    assert!(scott.referenced(&EMP_DEPT_FK).unwrap().contains(&DEPT_NAME));
    assert!(!scott.is_loaded(&EMP_MGR_FK));

    let select = Select::all(EMP).attributes(vec![LOCATION_CITY]);
    assert!(matches!(connection.select(&select), Err(EntityError::InvalidAttribute { .. })));
}

#[test]
fn ordering_paging_and_single_selects() {
    let connection = connection();
    let select = Select::all(EMP).order_by(OrderBy::descending(&[EMP_SAL])).limit(2);
    let names: Vec<Value> = connection
        .select(&select)
        .unwrap()
        .iter()
        .map(|e| e.value(&EMP_NAME))
        .collect();
    assert_eq!(names, vec![Value::from("KING"), Value::from("SCOTT")]);

    let select = Select::all(EMP).order_by(OrderBy::ascending(&[EMP_ID])).offset(2);
    assert_eq!(connection.select(&select).unwrap().len(), 1);

    assert!(matches!(
        connection.select_single(&Select::all(EMP)),
        Err(EntityError::MultipleRecordsFound)
    ));
    assert!(matches!(
        connection.select_by_key(&key(&connection, &EMP, 99)),
        Err(EntityError::RecordNotFound)
    ));
}

#[test]
fn select_keys_chunks_in_lists() {
    let connection = connection_with(Config::new().in_clause_limit(2));
    let keys: Vec<Key> = (1..=3).map(|id| key(&connection, &EMP, id)).collect();
    assert_eq!(connection.select_keys(&keys).unwrap().len(), 3);
    assert!(connection.select_keys(&[]).unwrap().is_empty());
}

#[test]
fn insert_and_insert_select() {
    let connection = connection();
    let entities = connection.entities();
    let operations = entities
        .entity(&DEPT)
        .unwrap()
        .with(&DEPT_ID, 30)
        .with(&DEPT_NAME, "OPERATIONS")
        .with(&DEPT_LOCATION, 1)
        .build()
        .unwrap();
    let keys = connection.insert(&[operations]).unwrap();
    assert_eq!(keys, vec![key(&connection, &DEPT, 30)]);

    let adams = entities
        .entity(&EMP)
        .unwrap()
        .with(&EMP_ID, 4)
        .with(&EMP_NAME, "ADAMS")
        .with(&EMP_DEPT, 30)
        .build()
        .unwrap();
    let stored = connection.insert_select(&[adams]).unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_modified());
    let dept = stored[0].referenced(&EMP_DEPT_FK).unwrap();
    assert_eq!(dept.value(&DEPT_NAME), Value::from("OPERATIONS"));
}

#[test]
fn generated_keys_are_put_into_the_entity() {
    let connection = connection();
    let boston = connection
        .entities()
        .entity(&LOCATION)
        .unwrap()
        .with(&LOCATION_CITY, "BOSTON")
        .build()
        .unwrap();
    let key = connection.insert_one(&boston).unwrap();
    assert_eq!(key.value(), &Value::from(2));
    let stored = connection.select_by_key(&key).unwrap();
    assert_eq!(stored.value(&LOCATION_CITY), Value::from("BOSTON"));
}

#[test]
fn empty_insert_is_rejected() {
    let connection = connection();
    let empty = connection.entities().entity(&DEPT).unwrap().build().unwrap();
    let result = connection.insert(&[empty]);
    assert!(matches!(result, Err(EntityError::InvalidEntity(_))));
}

#[test]
fn failed_batch_rolls_back() {
    let connection = connection();
    let entities = connection.entities();
    let new = entities
        .entity(&DEPT)
        .unwrap()
        .with(&DEPT_ID, 40)
        .with(&DEPT_NAME, "NEW")
        .build()
        .unwrap();
    let duplicate = entities
        .entity(&DEPT)
        .unwrap()
        .with(&DEPT_ID, 10)
        .with(&DEPT_NAME, "DUPLICATE")
        .build()
        .unwrap();
    let error = connection.insert(&[new, duplicate]).unwrap_err();
    match error {
        EntityError::Database { message, sql, .. } => {
            assert_eq!(message, "Unique key constraint violation");
            assert!(sql.unwrap().starts_with("insert into dept"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(connection.row_count(&all(DEPT)).unwrap(), 2);
    assert!(!connection.is_transaction_open());
}

#[test]
fn explicit_transactions() {
    let connection = connection();
    assert!(matches!(
        connection.commit_transaction(),
        Err(EntityError::TransactionState(_))
    ));
    assert!(matches!(
        connection.rollback_transaction(),
        Err(EntityError::TransactionState(_))
    ));

    connection.begin_transaction().unwrap();
    assert!(connection.is_transaction_open());
    assert!(matches!(
        connection.begin_transaction(),
        Err(EntityError::TransactionState(_))
    ));
    connection.delete_where(&column(&EMP_ID).equal_to(3)).unwrap();
    assert_eq!(connection.row_count(&all(EMP)).unwrap(), 2);
    connection.rollback_transaction().unwrap();
    assert_eq!(connection.row_count(&all(EMP)).unwrap(), 3);

    connection.begin_transaction().unwrap();
    connection.delete_where(&column(&EMP_ID).equal_to(3)).unwrap();
    connection.delete_where(&column(&EMP_ID).equal_to(2)).unwrap();
    connection.commit_transaction().unwrap();
    assert!(!connection.is_transaction_open());
    assert_eq!(connection.row_count(&all(EMP)).unwrap(), 1);
}

#[test]
fn read_only_types_reject_writes() {
    let connection = connection();
    let views = connection.select(&Select::all(DEPT_VIEW)).unwrap();
    assert_eq!(views.len(), 2);

    let mut view = views[0].clone();
    view.put(&DEPT_VIEW_NAME, "RENAMED").unwrap();
    assert!(matches!(connection.update(&[view.clone()]), Err(EntityError::ReadOnlyViolation(_))));
    assert!(matches!(connection.insert(&[view.clone()]), Err(EntityError::ReadOnlyViolation(_))));
    assert!(matches!(connection.delete_key(&view.key()), Err(EntityError::ReadOnlyViolation(_))));
    assert!(matches!(
        connection.delete_where(&all(DEPT_VIEW)),
        Err(EntityError::ReadOnlyViolation(_))
    ));
}

#[test]
fn update_returns_stored_entity() {
    let connection = connection();
    let mut jones = emp(&connection, 2);
    jones.put(&EMP_SAL, 3100.0).unwrap();
    let stored = connection.update_one(&jones).unwrap();
    assert_eq!(stored.value(&EMP_SAL), Value::Double(3100.0));
    assert!(!stored.is_modified());
    assert_eq!(emp(&connection, 2).value(&EMP_SAL), Value::Double(3100.0));
}

#[test]
fn update_can_change_the_primary_key() {
    let connection = connection();
    let new = connection
        .entities()
        .entity(&DEPT)
        .unwrap()
        .with(&DEPT_ID, 50)
        .with(&DEPT_NAME, "NEW")
        .build()
        .unwrap();
    let mut dept = connection.insert_select(&[new]).unwrap().remove(0);
    dept.put(&DEPT_ID, 51).unwrap();
    let stored = connection.update_one(&dept).unwrap();
    assert_eq!(stored.key(), key(&connection, &DEPT, 51));
    assert!(matches!(
        connection.select_by_key(&key(&connection, &DEPT, 50)),
        Err(EntityError::RecordNotFound)
    ));
}

#[test]
fn unmodified_update_is_rejected() {
    let connection = connection();
    let jones = emp(&connection, 2);
    assert!(matches!(connection.update(&[jones]), Err(EntityError::InvalidEntity(_))));
    assert!(connection.update(&[]).unwrap().is_empty());
}

#[test]
fn update_of_a_deleted_row_is_detected() {
    for locking in [true, false] {
        let connection = connection();
        connection.set_optimistic_locking(locking);
        let mut scott = emp(&connection, 3);
        connection.delete_key(&scott.key()).unwrap();
        scott.put(&EMP_SAL, 1.0).unwrap();
        match connection.update_one(&scott) {
            Err(EntityError::RecordModified { current, .. }) => assert!(current.is_none()),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#[test]
fn concurrent_modification_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scott.db");
    let mut sqlite = SqliteConnection::open(&path).unwrap();
    sqlite.execute_batch(SCHEMA).unwrap();
    let first = LocalEntityConnection::new(domain(), sqlite);
    let second = LocalEntityConnection::new(domain(), SqliteConnection::open(&path).unwrap());

    let mut jones_first = emp(&first, 2);
    let mut jones_second = emp(&second, 2);
    jones_first.put(&EMP_SAL, 3500.0).unwrap();
    first.update_one(&jones_first).unwrap();

    jones_second.put(&EMP_NAME, "JONES II").unwrap();
    let error = second.update_one(&jones_second).unwrap_err();
    assert_eq!(error.modified_key(), Some(jones_second.key()));
    match error {
        EntityError::RecordModified { current: Some(current), .. } => {
            assert_eq!(current.value(&EMP_SAL), Value::Double(3500.0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!second.is_transaction_open());

    second.set_optimistic_locking(false);
    let stored = second.update_one(&jones_second).unwrap();
    assert_eq!(stored.value(&EMP_NAME), Value::from("JONES II"));
    assert_eq!(stored.value(&EMP_SAL), Value::Double(3500.0));
}

#[test]
fn update_where_and_deletes() {
    let connection = connection();
    let update = Update::where_(column(&EMP_DEPT).equal_to(20))
        .set(&EMP_SAL, 1000.0)
        .build()
        .unwrap();
    assert_eq!(connection.update_where(&update).unwrap(), 2);
    assert_eq!(
        connection.row_count(&column(&EMP_SAL).equal_to(1000.0)).unwrap(),
        2
    );

    let mismatched = Update::where_(all(EMP)).set(&EMP_SAL, "a lot").build().unwrap();
    assert!(matches!(connection.update_where(&mismatched), Err(EntityError::InvalidEntity(_))));

    assert_eq!(connection.delete_where(&column(&EMP_NAME).equal_to("SCOTT")).unwrap(), 1);
    assert_eq!(connection.delete_keys(&[]).unwrap(), 0);
    let keys = vec![key(&connection, &EMP, 2), key(&connection, &EMP, 99)];
    assert_eq!(connection.delete_keys(&keys).unwrap(), 1);
}

#[test]
fn row_counts_and_distinct_values() {
    let connection = connection();
    assert_eq!(connection.row_count(&all(EMP)).unwrap(), 3);
    assert_eq!(connection.row_count(&column(&EMP_DEPT).equal_to(20)).unwrap(), 2);
    assert_eq!(
        connection.select_values(&EMP_DEPT, &all(EMP)).unwrap(),
        vec![Value::from(10), Value::from(20)]
    );
    assert_eq!(
        connection.select_values(&EMP_MGR, &all(EMP)).unwrap(),
        vec![Value::from(1), Value::from(2)]
    );
    assert_eq!(
        connection
            .select_values(&EMP_NAME, &column(&EMP_DEPT).equal_to(20))
            .unwrap(),
        vec![Value::from("JONES"), Value::from("SCOTT")]
    );
}

#[test]
fn blobs() {
    let connection = connection();
    let scott = key(&connection, &EMP, 3);
    assert_eq!(connection.read_blob(&scott, &EMP_PHOTO).unwrap(), None);
    connection.write_blob(&scott, &EMP_PHOTO, &[1, 2, 3]).unwrap();
    assert_eq!(connection.read_blob(&scott, &EMP_PHOTO).unwrap(), Some(vec![1, 2, 3]));

    assert!(matches!(
        connection.read_blob(&scott, &EMP_NAME),
        Err(EntityError::InvalidAttributeType { .. })
    ));
    let missing = key(&connection, &EMP, 99);
    assert!(matches!(connection.read_blob(&missing, &EMP_PHOTO), Err(EntityError::RecordNotFound)));
    assert!(matches!(
        connection.write_blob(&missing, &EMP_PHOTO, &[0]),
        Err(EntityError::RecordNotFound)
    ));
}

#[test]
fn dependencies_follow_hard_foreign_keys() {
    let connection = connection();
    let research = connection.select_by_key(&key(&connection, &DEPT, 20)).unwrap();
    let dependencies = connection.dependencies(&[research]).unwrap();
    assert_eq!(dependencies.len(), 1);
    assert_eq!(dependencies[&EMP].len(), 2);

    let scott = emp(&connection, 3);
    assert!(connection.dependencies(&[scott]).unwrap().is_empty());

    let king = emp(&connection, 1);
    let dependencies = connection.dependencies(&[king]).unwrap();
    assert_eq!(dependencies[&EMP].len(), 1);
    assert_eq!(dependencies[&EMP][0].value(&EMP_NAME), Value::from("JONES"));
}

#[test]
fn functions_run_against_the_same_connection() {
    let functions = Functions::new()
        .function(
            "emp_count",
            |connection: &dyn EntityConnection, _arguments: &[Value]| -> EntityResult<Value> {
                let count = connection.row_count(&all(EMP))?;
                Ok(Value::from(i64::try_from(count).unwrap()))
            },
        )
        .procedure(
            "raise",
            |connection: &dyn EntityConnection, arguments: &[Value]| -> EntityResult<()> {
                let update = Update::where_(all(EMP)).set(&EMP_SAL, arguments[0].clone()).build()?;
                connection.update_where(&update)?;
                Ok(())
            },
        );
    let connection = connection().functions(functions);

    connection.begin_transaction().unwrap();
    connection.delete_where(&column(&EMP_ID).equal_to(3)).unwrap();
    assert_eq!(connection.execute_function("emp_count", &[]).unwrap(), Value::from(2));
    connection.rollback_transaction().unwrap();

    connection.execute_procedure("raise", &[Value::from(6000.0)]).unwrap();
    assert_eq!(connection.row_count(&column(&EMP_SAL).equal_to(6000.0)).unwrap(), 3);

    assert!(matches!(
        connection.execute_function("missing", &[]),
        Err(EntityError::FunctionNotFound(_))
    ));
    assert!(matches!(
        connection.execute_procedure("emp_count", &[]),
        Err(EntityError::FunctionNotFound(_))
    ));
}

#[test]
fn connection_state() {
    let connection = connection();
    assert!(connection.is_connected());
    assert!(connection.optimistic_locking());
    assert!(connection.limit_fetch_depth());
    connection.set_optimistic_locking(false);
    assert!(!connection.optimistic_locking());
    let debug = format!("{connection:?}");
    assert!(debug.contains("scott"));
}

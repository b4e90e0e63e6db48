//! Engine round trip benchmarks on in-memory SQLite.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entisql_bench::{demo_connection, employees, FIRST_ID};
use entisql_core::{Config, EntityConnection};
use entisql_domain::condition::{self, column, Select};
use entisql_testkit::domain::{EMP, EMP_DEPT, EMP_SAL};

/// Benchmark batch inserts.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for batch_size in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let connection = demo_connection(Config::default());
                let mut next = FIRST_ID;
                b.iter(|| {
                    let batch = employees(connection.entities(), next, batch_size);
                    next += batch_size as i64;
                    connection.insert(black_box(&batch)).unwrap()
                });
            },
        );
    }
    group.finish();
}

/// Benchmark selects with foreign key resolution at increasing depths.
fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_employees");
    let connection = demo_connection(Config::default());
    connection
        .insert(&employees(connection.entities(), FIRST_ID, 1000))
        .unwrap();

    for depth in [0, 1, 2].iter() {
        group.bench_with_input(BenchmarkId::new("fetch_depth", depth), depth, |b, &depth| {
            let select = Select::where_(column(&EMP_DEPT).equal_to(20)).fetch_depth(depth);
            b.iter(|| connection.select(black_box(&select)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark selects by key.
fn bench_select_by_key(c: &mut Criterion) {
    let connection = demo_connection(Config::default());
    let key = connection
        .entities()
        .primary_key(&EMP, vec![7788.into()])
        .unwrap();

    c.bench_function("select_by_key", |b| {
        b.iter(|| connection.select_by_key(black_box(&key)).unwrap());
    });
}

/// Benchmark updates with and without optimistic locking.
fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    for locking in [true, false].iter() {
        group.bench_with_input(BenchmarkId::new("optimistic_locking", locking), locking, |b, &locking| {
            let connection = demo_connection(Config::default().optimistic_locking(locking));
            let key = connection
                .entities()
                .primary_key(&EMP, vec![7369.into()])
                .unwrap();
            let mut employee = connection.select_by_key(&key).unwrap();
            let mut salary = 800.0;
            b.iter(|| {
                salary += 1.0;
                employee.put(&EMP_SAL, salary).unwrap();
                employee = connection.update_one(black_box(&employee)).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark row counts.
fn bench_row_count(c: &mut Criterion) {
    let connection = demo_connection(Config::default());
    c.bench_function("row_count", |b| {
        b.iter(|| connection.row_count(black_box(&condition::all(EMP))).unwrap());
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_select,
    bench_select_by_key,
    bench_update,
    bench_row_count,
);
criterion_main!(benches);

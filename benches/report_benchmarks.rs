//! Performance benchmarks for the bundy attendance engine.
//!
//! Covers the hot paths of a kiosk deployment:
//! - Status derivation over a large log
//! - Report building for a fortnight and for a quarter
//! - The CSV export endpoint end to end
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tower::ServiceExt;

use bundy_engine::api::{AppState, create_router};
use bundy_engine::attendance::{build_report, day_bounds, derive_statuses};
use bundy_engine::clock::FixedClock;
use bundy_engine::config::ConfigLoader;
use bundy_engine::models::{Direction, Employee, PairingMode, TimeEntry};
use bundy_engine::store::InMemoryStore;

const EMPLOYEES: usize = 50;

fn employees() -> Vec<Employee> {
    (0..EMPLOYEES)
        .map(|i| Employee::new(format!("emp_{:03}", i), format!("Employee {:03}", i), "wslr"))
        .collect()
}

fn day_start(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap() + Duration::days(day)
}

/// One 09:00-17:00 Sydney shift per employee per day.
fn entries(days: i64) -> Vec<TimeEntry> {
    let mut log = Vec::new();
    let mut id = 1;
    for day in 0..days {
        for i in 0..EMPLOYEES {
            let start = day_start(day) + Duration::minutes(i as i64);
            for (direction, at) in [
                (Direction::In, start),
                (Direction::Out, start + Duration::hours(8)),
            ] {
                log.push(TimeEntry {
                    id,
                    employee_id: format!("emp_{:03}", i),
                    direction,
                    created_at: at,
                });
                id += 1;
            }
        }
    }
    log
}

fn bench_derive_statuses(c: &mut Criterion) {
    let staff = employees();
    let log = entries(90);

    let mut group = c.benchmark_group("derive_statuses");
    group.throughput(Throughput::Elements(log.len() as u64));
    group.bench_function("quarter_log", |b| {
        b.iter(|| black_box(derive_statuses(black_box(&staff), black_box(&log))))
    });
    group.finish();
}

fn bench_build_report(c: &mut Criterion) {
    let staff = employees();
    let zone = chrono_tz::Australia::Sydney;

    let mut group = c.benchmark_group("build_report");
    for days in [14i64, 90] {
        let log = entries(days);
        let start_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end_date = start_date + Duration::days(days);
        let (start, end) = day_bounds(start_date, end_date, zone);

        group.throughput(Throughput::Elements(log.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(days), &log, |b, log| {
            b.iter(|| {
                black_box(build_report(
                    &staff,
                    log,
                    start,
                    end,
                    zone,
                    PairingMode::Strict,
                ))
            })
        });
    }
    group.finish();
}

fn bench_export_endpoint(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = ConfigLoader::load("./config/kiosk.yaml")
        .expect("Failed to load config")
        .into_config();
    let store = Arc::new(InMemoryStore::new(config.org_id()));
    for employee in employees() {
        store.upsert_employee(employee).unwrap();
    }
    rt.block_on(async {
        use bundy_engine::models::NewTimeEntry;
        use bundy_engine::store::EventStore;
        for entry in entries(14) {
            store
                .insert(NewTimeEntry::new(entry.employee_id, entry.direction, entry.created_at))
                .await
                .unwrap();
        }
    });
    let clock = Arc::new(FixedClock::new(day_start(14)));
    let router = create_router(AppState::new(config, store.clone(), store, clock));

    c.bench_function("export_csv_fortnight", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/export?start=2024-01-02&end=2024-01-15")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

criterion_group!(
    benches,
    bench_derive_statuses,
    bench_build_report,
    bench_export_endpoint
);
criterion_main!(benches);

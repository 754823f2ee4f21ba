use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::hint::black_box;
use strava_etl::services::transform::{transform, transform_all};

fn activity(id: i64) -> Value {
    json!({
        "id": id,
        "athlete": {"id": 12345},
        "name": format!("Morning Run {}", id),
        "type": "Run",
        "sport_type": "TrailRun",
        "start_date": "2024-06-01T14:00:00Z",
        "start_date_local": "2024-06-01T07:00:00Z",
        "distance": 10234.5,
        "moving_time": 3120,
        "elapsed_time": 3400,
        "average_speed": 3.28,
        "max_speed": 5.1,
        "total_elevation_gain": 312.0,
        "average_cadence": 86.4,
        "kilojoules": 812.3,
        "has_heartrate": true,
        "average_heartrate": 151.26,
        "max_heartrate": 178.0,
        "elev_high": 402.7,
        "elev_low": 88.1
    })
}

fn benchmark_transform(c: &mut Criterion) {
    let single = activity(1);
    // A typical full-history sync: 25 pages of 200.
    let history: Vec<Value> = (1..=5000).map(activity).collect();

    let mut group = c.benchmark_group("transform");

    group.bench_function("single_activity", |b| {
        b.iter(|| transform(black_box(&single)))
    });

    group.bench_function("full_history_5000", |b| {
        b.iter(|| transform_all(black_box(&history)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_transform);
criterion_main!(benches);

use athlab::analytics::{self, Aggregator};
use athlab::database::{Database, RecordQuery};
use athlab::models::{TestCategory, TestRecord, TestType};
use athlab::{MetricNormalizer, RawInputs};
use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

/// Performance benchmarks for normalization and rollups
///
/// Sizes grow by decades to show how aggregation scales with history length.

fn bench_normalization(c: &mut Criterion) {
    let normalizer = MetricNormalizer::new();
    let mut group = c.benchmark_group("Normalization");

    for test_type in [
        TestType::VerticalJump,
        TestType::DailyReadiness,
        TestType::SimpleReactionTime,
        TestType::CustomObstacleCircuit,
        TestType::IllinoisAgilityTest,
    ] {
        let inputs = sample_inputs(test_type, 0);
        group.bench_with_input(
            BenchmarkId::new("normalize", test_type.slug()),
            &inputs,
            |b, inputs| {
                b.iter(|| normalizer.normalize(black_box(test_type), black_box(inputs)));
            },
        );
    }

    // Reaction trials dominate input size
    for &trials in &[10, 100, 1000] {
        let light: Vec<f64> = (0..trials).map(|i| 220.0 + (i % 40) as f64).collect();
        let inputs = RawInputs::new().with("lightTrials", light);

        group.throughput(Throughput::Elements(trials as u64));
        group.bench_with_input(
            BenchmarkId::new("reaction_trials", trials),
            &inputs,
            |b, inputs| {
                b.iter(|| normalizer.normalize(TestType::SimpleReactionTime, black_box(inputs)));
            },
        );
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let aggregator = Aggregator::default();
    let mut group = c.benchmark_group("Aggregation");

    for &size in &[10, 100, 1000] {
        let records = create_record_series(size);

        group.throughput(Throughput::Elements(size as u64));
        for category in [TestCategory::SpeedAgility, TestCategory::Overall] {
            group.bench_with_input(
                BenchmarkId::new(category.as_str(), size),
                &records,
                |b, records| {
                    b.iter(|| aggregator.aggregate(category, black_box(records), start()));
                },
            );
        }
    }

    group.finish();
}

fn bench_dashboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dashboard");

    for &size in &[10, 100, 1000] {
        let records = create_record_series(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("dashboard", size), &records, |b, records| {
            b.iter(|| analytics::dashboard(black_box(records), 5.0, start()));
        });
    }

    group.finish();
}

fn bench_database_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("Database Operations");

    for &size in &[10, 100, 1000] {
        let records = create_record_series(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("insert", size), &records, |b, records| {
            b.iter(|| {
                let db = Database::in_memory().unwrap();
                for record in records {
                    db.insert_record(record).unwrap();
                }
            });
        });

        let db = Database::in_memory().unwrap();
        for record in &records {
            db.insert_record(record).unwrap();
        }
        let query = RecordQuery::for_athlete("athlete-bench").category(TestCategory::SpeedAgility);
        group.bench_with_input(BenchmarkId::new("find_records", size), &query, |b, query| {
            b.iter(|| db.find_records(black_box(query)).unwrap());
        });
    }

    group.finish();
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap()
}

fn sample_inputs(test_type: TestType, seed: usize) -> RawInputs {
    let variation = (seed as f64 * 0.1).sin();
    let value = match test_type {
        TestType::VerticalJump => json!({"jumpHeight": 60.0 + 5.0 * variation, "athleteWeight": 78}),
        TestType::DailyReadiness => json!({
            "sleepQuality": 4, "fatigue": 3, "muscleSoreness": 4, "stressLevels": 3, "mood": 5
        }),
        TestType::SimpleReactionTime => json!({
            "lightTrials": [240, 255, 231],
            "soundTrials": [{"reactionTime": 210, "accuracy": true}, {"reactionTime": 260, "accuracy": false}]
        }),
        TestType::CustomObstacleCircuit => json!({
            "obstacles": [
                {"name": "wall", "time": 12.5 + variation, "penalties": 1},
                {"name": "rope", "time": 20.0, "penaltyTime": 10}
            ],
            "cutoffTime": 45
        }),
        TestType::IllinoisAgilityTest => json!({"completionTime": 16.5 + variation, "gender": "male"}),
        _ => json!({"completionTime": 10.0 + variation}),
    };
    RawInputs::from_value(value).unwrap()
}

fn create_record_series(size: usize) -> Vec<TestRecord> {
    let normalizer = MetricNormalizer::new();
    let rotation = [
        TestType::IllinoisAgilityTest,
        TestType::VerticalJump,
        TestType::DailyReadiness,
        TestType::SimpleReactionTime,
        TestType::CustomObstacleCircuit,
    ];

    (0..size)
        .map(|i| {
            let test_type = rotation[i % rotation.len()];
            TestRecord::new(
                "athlete-bench",
                test_type,
                start() + Duration::hours(i as i64 * 6),
                sample_inputs(test_type, i),
                &normalizer,
            )
            .unwrap()
        })
        .collect()
}

criterion_group!(
    benches,
    bench_normalization,
    bench_aggregation,
    bench_dashboard,
    bench_database_operations
);

criterion_main!(benches);

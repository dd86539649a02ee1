//! End-to-end workflows through the service, a file-backed database and export

use athlab::config::AppConfig;
use athlab::database::{Database, RecordQuery};
use athlab::drills::{Difficulty, Drill, DrillCategory};
use athlab::export::{export_records, export_summaries, ExportFormat};
use athlab::hrf::{Calculation, DataField, HrfCategory, HrfTestDefinition};
use athlab::models::{
    AnalyticsPeriod, Direction, Gender, MetricKind, Rating, TestCategory, TestRecord, TestType,
    Trend,
};
use athlab::service::{NewTest, TestingService};
use athlab::thresholds::{Boundary, ThresholdEntry, TierThresholds};
use athlab::RawInputs;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.settings.data_dir = dir.path().join("data");
    config.runner.script_dir = dir.path().join("protocols");
    config
}

fn at(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 7, 30, 0).unwrap() + Duration::days(day)
}

fn inputs(value: serde_json::Value) -> RawInputs {
    RawInputs::from_value(value).unwrap()
}

fn submit(svc: &TestingService, test_type: TestType, day: i64, value: serde_json::Value) -> TestRecord {
    svc.submit(NewTest::new("athlete-7", test_type, inputs(value)).at(at(day)))
        .unwrap()
}

#[test]
fn test_records_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let id = {
        let svc = TestingService::from_config(&config).unwrap();
        submit(&svc, TestType::VerticalJump, 0, json!({"jumpHeight": 65, "athleteWeight": 75})).id
    };

    assert!(config.database_path().exists());
    let svc = TestingService::from_config(&config).unwrap();
    let record = svc.get(&id).unwrap();
    assert_eq!(record.performance.rating, Rating::Average);
    assert!((record.derived.get("takeoffVelocity").unwrap() - 3.5711).abs() < 1e-3);
}

#[test]
fn test_monthly_speed_agility_workflow() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();

    for day in 0..5 {
        submit(
            &svc,
            TestType::IllinoisAgilityTest,
            day,
            json!({"completionTime": 18.0, "gender": "male"}),
        );
    }
    for day in 5..10 {
        submit(
            &svc,
            TestType::IllinoisAgilityTest,
            day,
            json!({"completionTime": 16.0, "gender": "male"}),
        );
    }
    // Different category, same month
    submit(&svc, TestType::VerticalJump, 3, json!({"jumpHeight": 71, "athleteWeight": 80}));

    let now = Utc.with_ymd_and_hms(2024, 6, 28, 12, 0, 0).unwrap();
    let summary = svc
        .generate_analytics("athlete-7", AnalyticsPeriod::Month, TestCategory::SpeedAgility, now)
        .unwrap();

    assert_eq!(summary.metrics.total_tests, 10);
    assert_eq!(summary.metrics.improvement_rate, 11);
    assert_eq!(summary.metrics.best_performance, 16.0);
    assert_eq!(summary.metrics.worst_performance, 18.0);
    assert_eq!(summary.trends.overall_trend, Trend::Improving);
    assert_eq!(summary.start_date, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    assert_eq!(summary.test_ids[&TestType::IllinoisAgilityTest].len(), 10);
    assert!(!summary.test_ids.contains_key(&TestType::VerticalJump));

    let overall = svc
        .generate_analytics("athlete-7", AnalyticsPeriod::Month, TestCategory::Overall, now)
        .unwrap();
    assert_eq!(overall.metrics.total_tests, 11);

    let stored = svc
        .list_analytics("athlete-7", Some(AnalyticsPeriod::Month), None)
        .unwrap();
    assert_eq!(stored.len(), 2);

    let speed_only = svc
        .list_analytics("athlete-7", None, Some(TestCategory::SpeedAgility))
        .unwrap();
    assert_eq!(speed_only, vec![summary]);
}

#[test]
fn test_history_trend_uses_only_same_test_type() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();

    submit(&svc, TestType::TTest, 0, json!({"completionTime": 11.0}));
    // A slow 505 run must not influence the T-Test baseline
    submit(&svc, TestType::Agility505, 1, json!({"completionTime": 30.0}));
    let second = submit(&svc, TestType::TTest, 2, json!({"completionTime": 10.0}));

    assert_eq!(second.performance.trend, Trend::Improving);
}

#[test]
fn test_dashboard_over_trailing_window() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();

    submit(
        &svc,
        TestType::DailyReadiness,
        0,
        json!({"sleepQuality": 3, "fatigue": 3, "muscleSoreness": 3, "stressLevels": 3, "mood": 3}),
    );
    submit(
        &svc,
        TestType::DailyReadiness,
        5,
        json!({"scores": {"sleepQuality": 5, "fatigue": 4, "muscleSoreness": 4, "stressLevels": 4, "mood": 5}}),
    );
    // Outside a 30-day window ending on day 10
    submit(&svc, TestType::VerticalJump, -40, json!({"jumpHeight": 55, "athleteWeight": 70}));

    let stats = svc.dashboard("athlete-7", 30, at(10)).unwrap();
    assert_eq!(stats.total_tests, 2);
    assert_eq!(stats.category_breakdown[&TestCategory::NeuromuscularReadiness], 2);
    assert_eq!(stats.category_breakdown[&TestCategory::AnaerobicPower], 0);
    assert_eq!(stats.recent_performance.avg_readiness, 74.0);
    assert_eq!(stats.trends.readiness, Trend::Improving);
}

#[test]
fn test_threshold_overrides_from_config() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.thresholds.push(ThresholdEntry {
        test_type: TestType::IllinoisAgilityTest,
        gender: Some(Gender::Male),
        metric: "completionTime".to_string(),
        direction: Direction::LowerIsBetter,
        boundary: Boundary::Strict,
        tiers: TierThresholds::new(16.5, 17.5, 18.5, 19.5),
    });

    let path = dir.path().join("config.toml");
    config.save_to_file(&path).unwrap();
    let loaded = AppConfig::load_from_file(&path).unwrap();
    let svc = TestingService::from_config(&loaded).unwrap();

    let male = submit(
        &svc,
        TestType::IllinoisAgilityTest,
        0,
        json!({"completionTime": 16.0, "gender": "male"}),
    );
    assert_eq!(male.performance.rating, Rating::Excellent);

    // Female ladder is untouched
    let female = submit(
        &svc,
        TestType::IllinoisAgilityTest,
        1,
        json!({"completionTime": 18.0, "gender": "female"}),
    );
    assert_eq!(female.performance.rating, Rating::Average);
}

#[test]
fn test_update_and_delete_round_trip() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();

    let record = submit(
        &svc,
        TestType::CustomObstacleCircuit,
        0,
        json!({"obstacles": [{"name": "wall", "time": 12.5, "penalties": 1}], "cutoffTime": 20}),
    );
    assert_eq!(record.status.as_deref(), Some("PASS"));

    let updated = svc
        .update(
            &record.id,
            inputs(json!({"obstacles": [{"name": "wall", "time": 12.5, "penalties": 2}], "cutoffTime": 20})),
        )
        .unwrap();
    assert_eq!(updated.derived.get("finalAdjustedTime"), Some(22.5));
    assert_eq!(updated.status.as_deref(), Some("FAIL"));

    let bad = svc.update(&record.id, inputs(json!({"obstacles": []})));
    assert_eq!(bad.unwrap_err().status_code(), 400);
    assert_eq!(svc.get(&record.id).unwrap(), updated);

    svc.delete(&record.id).unwrap();
    assert_eq!(svc.get(&record.id).unwrap_err().status_code(), 404);
}

#[test]
fn test_export_after_analysis() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();

    for day in 0..3 {
        submit(&svc, TestType::TTest, day, json!({"completionTime": 10.0 + day as f64 * 0.1}));
    }
    svc.generate_analytics(
        "athlete-7",
        AnalyticsPeriod::Year,
        TestCategory::SpeedAgility,
        at(5),
    )
    .unwrap();

    let records = svc.list(&RecordQuery::for_athlete("athlete-7")).unwrap();
    let csv_path = dir.path().join("tests.csv");
    export_records(&records, ExportFormat::Csv, &csv_path).unwrap();
    assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 4);

    let summaries = svc.list_analytics("athlete-7", None, None).unwrap();
    let json_path = dir.path().join("summaries.json");
    export_summaries(&summaries, ExportFormat::Json, &json_path).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(parsed[0]["period"], "year");
    assert_eq!(parsed[0]["metrics"]["totalTests"], 3);
}

#[test]
fn test_drill_sessions_roll_up_into_mental_neural_analytics() {
    let dir = TempDir::new().unwrap();
    let svc = TestingService::from_config(&config_in(&dir)).unwrap();
    let drill = svc
        .create_drill(
            Drill::new("Light Board", DrillCategory::Reaction)
                .unwrap()
                .with_difficulty(Difficulty::Intermediate),
        )
        .unwrap();

    // Score 69, one missed response
    let slow = submit(
        &svc,
        TestType::MentalNeuralSession,
        0,
        json!({"drillId": drill.id, "results": [
            {"reactionTime": 500}, {"reactionTime": 520},
            {"reactionTime": 540}, {"reactionTime": 2100, "responseType": "missed"}
        ]}),
    );
    assert_eq!(slow.derived.get("score"), Some(69.0));
    assert_eq!(slow.performance.rating, Rating::BelowAverage);

    for day in 1..6 {
        let fast = submit(
            &svc,
            TestType::MentalNeuralSession,
            day,
            json!({"drillId": drill.id, "results": [
                {"reactionTime": 300}, {"reactionTime": 320}, {"reactionTime": 340}
            ]}),
        );
        assert_eq!(fast.derived.get("score"), Some(87.0));
    }

    let sessions = svc
        .list(&RecordQuery::for_athlete("athlete-7").drill(drill.id.clone()))
        .unwrap();
    assert_eq!(sessions.len(), 6);

    let now = Utc.with_ymd_and_hms(2024, 6, 28, 12, 0, 0).unwrap();
    let summary = svc
        .generate_analytics("athlete-7", AnalyticsPeriod::Month, TestCategory::MentalNeural, now)
        .unwrap();
    assert_eq!(summary.metrics.total_tests, 6);
    assert_eq!(summary.metrics.average_score, 84.0);
    assert_eq!(summary.trends.metric_trends[&MetricKind::ReactionTime], Trend::Improving);
    assert_eq!(summary.trends.metric_trends[&MetricKind::Accuracy], Trend::Improving);
    assert!(summary.recommendations.iter().all(|r| r.category != "accuracy"));
}

#[test]
fn test_health_related_fitness_assessments() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.hrf_tests.push(HrfTestDefinition {
        id: "plank".to_string(),
        name: "Plank Hold".to_string(),
        description: String::new(),
        category: HrfCategory::StrengthEndurance,
        data_fields: vec![DataField::number("hold", "Hold time", "s")],
        calculations: vec![Calculation::new("holdMinutes", "Hold in minutes", "hold / 60", "min")],
    });
    let path = dir.path().join("config.toml");
    config.save_to_file(&path).unwrap();
    let svc = TestingService::from_config(&AppConfig::load_from_file(&path).unwrap()).unwrap();

    let cooper = submit(&svc, TestType::CooperTest, 0, json!({"distance": 2800}));
    assert_eq!(cooper.derived.get("vo2Max"), Some(51.31));
    assert_eq!(cooper.status.as_deref(), Some("very_good"));
    assert_eq!(cooper.performance, athlab::models::Performance::default());

    let plank = submit(
        &svc,
        TestType::HrfAssessment,
        1,
        json!({"testId": "plank", "values": {"hold": 90}}),
    );
    assert_eq!(plank.derived.get("holdMinutes"), Some(1.5));

    let shuttle = submit(
        &svc,
        TestType::HrfAssessment,
        2,
        json!({"testId": "shuttle-run-20m", "values": {"finalLevel": 9, "finalShuttles": 4}}),
    );
    assert!(shuttle.derived.get("vo2Max").unwrap() > 69.0);

    let missing = svc.submit(NewTest::new(
        "athlete-7",
        TestType::HrfAssessment,
        inputs(json!({"testId": "sit-and-reach", "values": {"trial1": 20}})),
    ));
    assert_eq!(missing.unwrap_err().status_code(), 400);

    let summary = svc
        .generate_analytics(
            "athlete-7",
            AnalyticsPeriod::Month,
            TestCategory::HealthRelatedFitness,
            at(3),
        )
        .unwrap();
    assert_eq!(summary.metrics.total_tests, 3);
    assert!(summary.metrics.best_performance > 69.0);
}

#[test]
fn test_in_memory_database_isolated_per_handle() {
    let config = AppConfig::default();
    let a = TestingService::new(Database::in_memory().unwrap(), &config);
    let b = TestingService::new(Database::in_memory().unwrap(), &config);

    let record = a
        .submit(NewTest::new("x", TestType::TTest, RawInputs::new().with("completionTime", 10.0)))
        .unwrap();
    assert!(b.get(&record.id).is_err());
}

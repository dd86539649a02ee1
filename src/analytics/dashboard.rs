use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{classify_change, mean_or_zero};
use crate::models::{MetricKind, TestCategory, TestRecord, Trend};

/// Headline averages over the dashboard window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPerformance {
    pub avg_readiness: f64,
    pub avg_reaction_time: f64,
    pub avg_agility_time: f64,
    pub avg_jump_height: f64,
}

/// First-versus-last trend per headline metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardTrends {
    pub readiness: Trend,
    pub reaction: Trend,
    pub agility: Trend,
    pub power: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tests: usize,
    pub category_breakdown: BTreeMap<TestCategory, usize>,
    pub recent_performance: RecentPerformance,
    pub trends: DashboardTrends,
    pub generated_at: DateTime<Utc>,
}

fn series(records: &[&TestRecord], kind: MetricKind) -> Vec<f64> {
    records.iter().filter_map(|r| r.metric(kind)).collect()
}

fn first_vs_last(values: &[f64], kind: MetricKind, deadband_pct: f64) -> Trend {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => {
            classify_change(*first, *last, kind.direction(), deadband_pct)
        }
        _ => Trend::Stable,
    }
}

/// Dashboard statistics over an already windowed set of records
pub fn dashboard(records: &[TestRecord], deadband_pct: f64, now: DateTime<Utc>) -> DashboardStats {
    let mut ordered: Vec<&TestRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.recorded_at);

    let mut category_breakdown: BTreeMap<TestCategory, usize> =
        TestCategory::TESTED.iter().map(|c| (*c, 0)).collect();
    for record in &ordered {
        *category_breakdown.entry(record.category()).or_default() += 1;
    }

    let readiness = series(&ordered, MetricKind::Readiness);
    let reaction = series(&ordered, MetricKind::ReactionTime);
    let agility = series(&ordered, MetricKind::CompletionTime);
    let power = series(&ordered, MetricKind::JumpHeight);

    DashboardStats {
        total_tests: ordered.len(),
        category_breakdown,
        recent_performance: RecentPerformance {
            avg_readiness: mean_or_zero(&readiness).round(),
            avg_reaction_time: mean_or_zero(&reaction).round(),
            avg_agility_time: (mean_or_zero(&agility) * 100.0).round() / 100.0,
            avg_jump_height: mean_or_zero(&power).round(),
        },
        trends: DashboardTrends {
            readiness: first_vs_last(&readiness, MetricKind::Readiness, deadband_pct),
            reaction: first_vs_last(&reaction, MetricKind::ReactionTime, deadband_pct),
            agility: first_vs_last(&agility, MetricKind::CompletionTime, deadband_pct),
            power: first_vs_last(&power, MetricKind::JumpHeight, deadband_pct),
        },
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::RawInputs;
    use crate::models::TestType;
    use crate::normalize::MetricNormalizer;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn record(test_type: TestType, day: i64, inputs: serde_json::Value) -> TestRecord {
        TestRecord::new(
            "athlete-1",
            test_type,
            Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap() + Duration::days(day),
            RawInputs::from_value(inputs).unwrap(),
            &MetricNormalizer::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = dashboard(&[], 5.0, Utc::now());
        assert_eq!(stats.total_tests, 0);
        assert_eq!(stats.category_breakdown.len(), TestCategory::TESTED.len());
        assert!(stats.category_breakdown.values().all(|n| *n == 0));
        assert_eq!(stats.recent_performance, RecentPerformance::default());
        assert_eq!(stats.trends, DashboardTrends::default());
    }

    #[test]
    fn test_dashboard_averages_and_trends() {
        // Deliberately unsorted; the dashboard orders by timestamp itself
        let records = vec![
            record(TestType::IllinoisAgilityTest, 3, json!({"completionTime": 16.0, "gender": "male"})),
            record(TestType::IllinoisAgilityTest, 0, json!({"completionTime": 17.25, "gender": "male"})),
            record(TestType::VerticalJump, 1, json!({"jumpHeight": 50, "athleteWeight": 70})),
            record(TestType::VerticalJump, 2, json!({"jumpHeight": 51, "athleteWeight": 70})),
            record(TestType::TTest, 4, json!({"completionTime": 10.1})),
        ];

        let stats = dashboard(&records, 5.0, Utc::now());
        assert_eq!(stats.total_tests, 5);
        assert_eq!(stats.category_breakdown[&TestCategory::SpeedAgility], 3);
        assert_eq!(stats.category_breakdown[&TestCategory::AnaerobicPower], 2);
        assert_eq!(stats.recent_performance.avg_agility_time, 16.63);
        assert_eq!(stats.recent_performance.avg_jump_height, 51.0);
        assert_eq!(stats.trends.agility, Trend::Improving);
        assert_eq!(stats.trends.power, Trend::Stable);
        assert_eq!(stats.trends.readiness, Trend::Stable);
    }
}

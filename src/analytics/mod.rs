//! Trend and rollup aggregation
//!
//! [`Aggregator::aggregate`] turns one athlete's time-ordered records into
//! aggregate metrics, deadband trends and recommendations. It is a full
//! recompute over its input and keeps no state between calls.

pub mod dashboard;
pub mod period;
pub mod recommendations;
pub mod trend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AnalyticsConfig;
use crate::error::AggregationError;
use crate::models::{
    AnalyticsMetrics, AnalyticsPeriod, AnalyticsSummary, AnalyticsTrends, Direction, MetricKind,
    Recommendation, TestCategory, TestRecord, TestType, Trend,
};
use recommendations::RuleInputs;

pub use dashboard::{dashboard, DashboardStats};
pub use trend::{classify_change, improvement_rate, majority};

/// Mean where non-finite values count as zero; an empty set averages to zero
pub fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().filter(|v| v.is_finite()).sum();
    sum / values.len() as f64
}

/// `100 - CV%` clamped at zero; fewer than two samples are perfectly consistent
pub fn consistency_score(values: &[f64]) -> f64 {
    use statrs::statistics::Statistics;

    if values.len() < 2 {
        return 100.0;
    }
    let mean = mean_or_zero(values);
    if mean == 0.0 {
        return 100.0;
    }
    let cv = values.iter().population_std_dev() / mean.abs() * 100.0;
    (100.0 - cv).max(0.0).round()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Values of one metric across records that produce it
fn metric_values(records: &[&TestRecord], kind: MetricKind) -> Vec<f64> {
    records.iter().filter_map(|r| r.metric(kind)).collect()
}

/// Means of a metric in both windows, or `None` when either window lacks it
fn window_means(older: &[&TestRecord], recent: &[&TestRecord], kind: MetricKind) -> Option<(f64, f64)> {
    let older_values = metric_values(older, kind);
    let recent_values = metric_values(recent, kind);
    if older_values.is_empty() || recent_values.is_empty() {
        return None;
    }
    Some((mean_or_zero(&older_values), mean_or_zero(&recent_values)))
}

/// (best, worst) respecting direction; zeros when there is nothing to compare
fn extremes(values: &[f64], direction: Direction) -> (f64, f64) {
    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);
    let (best, worst) = match direction {
        Direction::LowerIsBetter => (min, max),
        Direction::HigherIsBetter => (max, min),
    };
    (best.map(round2).unwrap_or(0.0), worst.map(round2).unwrap_or(0.0))
}

/// Result of one aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub metrics: AnalyticsMetrics,
    pub trends: AnalyticsTrends,
    pub recommendations: Vec<Recommendation>,
    pub test_ids: BTreeMap<TestType, Vec<String>>,
    pub generated_at: DateTime<Utc>,
}

impl AggregateOutcome {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            metrics: AnalyticsMetrics::default(),
            trends: AnalyticsTrends::default(),
            recommendations: Vec::new(),
            test_ids: BTreeMap::new(),
            generated_at: now,
        }
    }

    /// Attach identity and window to produce a persistable summary
    pub fn into_summary(
        self,
        athlete_id: impl Into<String>,
        period: AnalyticsPeriod,
        category: TestCategory,
        (start_date, end_date): (DateTime<Utc>, DateTime<Utc>),
    ) -> AnalyticsSummary {
        AnalyticsSummary {
            id: uuid::Uuid::new_v4().to_string(),
            athlete_id: athlete_id.into(),
            period,
            category,
            start_date,
            end_date,
            metrics: self.metrics,
            trends: self.trends,
            recommendations: self.recommendations,
            test_ids: self.test_ids,
            generated_at: self.generated_at,
        }
    }
}

/// Rollup aggregator
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AnalyticsConfig,
}

impl Aggregator {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Aggregate `records`, which must be sorted by `recorded_at` ascending.
    ///
    /// Records outside `category` are ignored. An empty selection yields zero
    /// metrics, stable trends and no recommendations.
    pub fn aggregate(
        &self,
        category: TestCategory,
        records: &[TestRecord],
        now: DateTime<Utc>,
    ) -> Result<AggregateOutcome, AggregationError> {
        let _span = tracing::debug_span!("aggregate", %category, records = records.len()).entered();

        if let Some(index) = records
            .windows(2)
            .position(|pair| pair[1].recorded_at < pair[0].recorded_at)
        {
            return Err(AggregationError::OutOfOrder { index: index + 1 });
        }

        let scoped: Vec<&TestRecord> = records
            .iter()
            .filter(|r| category.includes(r.test_type))
            .collect();

        if scoped.is_empty() {
            tracing::debug!("No records in scope");
            return Ok(AggregateOutcome::empty(now));
        }

        let mut test_ids: BTreeMap<TestType, Vec<String>> = BTreeMap::new();
        for record in &scoped {
            test_ids
                .entry(record.test_type)
                .or_default()
                .push(record.id.clone());
        }

        let primary = category.primary_metric();
        let scores: Vec<f64> = scoped.iter().map(|r| r.score()).collect();
        let primary_values = metric_values(&scoped, primary);
        let (best_performance, worst_performance) = extremes(&primary_values, primary.direction());

        let mut metrics = AnalyticsMetrics {
            total_tests: scoped.len(),
            average_score: mean_or_zero(&scores).round(),
            improvement_rate: 0,
            consistency_score: consistency_score(&primary_values),
            best_performance,
            worst_performance,
        };

        let mut trends = self.compare_windows(category, &scoped, &mut metrics);
        if category == TestCategory::Overall {
            self.rank_categories(&scoped, &mut trends);
        }

        let accuracy = metric_values(&scoped, MetricKind::Accuracy);
        let reaction_accuracy = (!accuracy.is_empty()).then(|| mean_or_zero(&accuracy));

        let recommendations = recommendations::synthesize(
            RuleInputs {
                category,
                metrics: &metrics,
                overall_trend: trends.overall_trend,
                reaction_accuracy,
            },
            &self.config,
        );

        tracing::info!(
            %category,
            total_tests = metrics.total_tests,
            average_score = metrics.average_score,
            overall_trend = %trends.overall_trend,
            recommendations = recommendations.len(),
            "Aggregated test records"
        );

        Ok(AggregateOutcome {
            metrics,
            trends,
            recommendations,
            test_ids,
            generated_at: now,
        })
    }

    /// Split into older/recent windows and classify every tracked metric
    fn compare_windows(
        &self,
        category: TestCategory,
        scoped: &[&TestRecord],
        metrics: &mut AnalyticsMetrics,
    ) -> AnalyticsTrends {
        let tracked = category.tracked_metrics();
        let mut trends = AnalyticsTrends {
            metric_trends: tracked.iter().map(|k| (*k, Trend::Stable)).collect(),
            ..AnalyticsTrends::default()
        };

        let split = scoped.len().saturating_sub(self.config.recent_window);
        let (older, recent) = scoped.split_at(split);
        if older.is_empty() {
            return trends;
        }

        let deadband = self.config.deadband_pct;
        for kind in tracked {
            // A metric absent from either window has nothing to compare
            if let Some((older_mean, recent_mean)) = window_means(older, recent, *kind) {
                let trend = classify_change(older_mean, recent_mean, kind.direction(), deadband);
                trends.metric_trends.insert(*kind, trend);
            }
        }

        let primary = category.primary_metric();
        if let Some((older_mean, recent_mean)) = window_means(older, recent, primary) {
            metrics.improvement_rate = improvement_rate(older_mean, recent_mean, primary.direction());
            trends.consistency_trend = classify_change(
                consistency_score(&metric_values(older, primary)),
                consistency_score(&metric_values(recent, primary)),
                Direction::HigherIsBetter,
                deadband,
            );
        }

        let per_metric: Vec<Trend> = trends.metric_trends.values().copied().collect();
        trends.overall_trend = majority(&per_metric);

        trends
    }

    /// Improvement rate of a single category's primary metric
    fn category_rate(&self, category: TestCategory, records: &[&TestRecord]) -> i64 {
        let mut metrics = AnalyticsMetrics::default();
        self.compare_windows(category, records, &mut metrics);
        metrics.improvement_rate
    }

    /// Name the categories improving fastest and slowest among those with enough history
    fn rank_categories(&self, scoped: &[&TestRecord], trends: &mut AnalyticsTrends) {
        let rates: Vec<(TestCategory, i64)> = TestCategory::TESTED
            .iter()
            .filter_map(|category| {
                let members: Vec<&TestRecord> = scoped
                    .iter()
                    .copied()
                    .filter(|r| r.category() == *category)
                    .collect();
                (members.len() >= self.config.min_history)
                    .then(|| (*category, self.category_rate(*category, &members)))
            })
            .collect();

        trends.fastest_improving = rates
            .iter()
            .rev()
            .max_by_key(|(_, rate)| *rate)
            .map(|(category, _)| *category);
        trends.slowest_improving = rates
            .iter()
            .min_by_key(|(_, rate)| *rate)
            .map(|(category, _)| *category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::RawInputs;
    use crate::models::Priority;
    use crate::normalize::MetricNormalizer;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn record(test_type: TestType, day: i64, inputs: serde_json::Value) -> TestRecord {
        TestRecord::new(
            "athlete-1",
            test_type,
            start() + Duration::days(day),
            RawInputs::from_value(inputs).unwrap(),
            &MetricNormalizer::new(),
        )
        .unwrap()
    }

    fn illinois(times: &[f64]) -> Vec<TestRecord> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| {
                record(
                    TestType::IllinoisAgilityTest,
                    i as i64,
                    json!({"completionTime": t, "gender": "male"}),
                )
            })
            .collect()
    }

    fn readiness(day: i64, scores: [u8; 5]) -> TestRecord {
        record(
            TestType::DailyReadiness,
            day,
            json!({
                "sleepQuality": scores[0],
                "fatigue": scores[1],
                "muscleSoreness": scores[2],
                "stressLevels": scores[3],
                "mood": scores[4]
            }),
        )
    }

    fn jump(day: i64, height: f64) -> TestRecord {
        record(
            TestType::VerticalJump,
            day,
            json!({"jumpHeight": height, "athleteWeight": 75}),
        )
    }

    fn now() -> DateTime<Utc> {
        start() + Duration::days(60)
    }

    #[test]
    fn test_empty_input_is_zero_valued() {
        let outcome = Aggregator::default()
            .aggregate(TestCategory::Overall, &[], now())
            .unwrap();

        assert_eq!(outcome.metrics, AnalyticsMetrics::default());
        assert_eq!(outcome.trends.overall_trend, Trend::Stable);
        assert_eq!(outcome.trends.consistency_trend, Trend::Stable);
        assert!(outcome.recommendations.is_empty());
        assert!(outcome.test_ids.is_empty());
        assert_eq!(outcome.generated_at, now());
    }

    #[test]
    fn test_short_history_is_stable() {
        let records = illinois(&[19.0, 18.0, 17.0, 16.0, 15.0]);
        let outcome = Aggregator::default()
            .aggregate(TestCategory::SpeedAgility, &records, now())
            .unwrap();

        assert_eq!(outcome.metrics.total_tests, 5);
        assert_eq!(outcome.metrics.improvement_rate, 0);
        assert_eq!(outcome.trends.overall_trend, Trend::Stable);
        assert_eq!(
            outcome.trends.metric_trends.get(&MetricKind::CompletionTime),
            Some(&Trend::Stable)
        );
    }

    #[test]
    fn test_improving_agility() {
        let records = illinois(&[18.0, 18.0, 18.0, 18.0, 18.0, 16.0, 16.0, 16.0, 16.0, 16.0]);
        let outcome = Aggregator::default()
            .aggregate(TestCategory::SpeedAgility, &records, now())
            .unwrap();

        let m = &outcome.metrics;
        assert_eq!(m.total_tests, 10);
        assert_eq!(m.improvement_rate, 11);
        assert_eq!(m.best_performance, 16.0);
        assert_eq!(m.worst_performance, 18.0);
        assert_eq!(m.consistency_score, 94.0);
        // average (50) and good (75) tiers
        assert_eq!(m.average_score, 63.0);

        assert_eq!(outcome.trends.overall_trend, Trend::Improving);
        assert_eq!(outcome.test_ids[&TestType::IllinoisAgilityTest].len(), 10);

        let categories: Vec<&str> = outcome
            .recommendations
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert_eq!(categories, vec!["performance"]);
    }

    #[test]
    fn test_average_score_65_gives_one_high_performance_entry() {
        let records = vec![
            readiness(0, [3, 3, 3, 3, 3]),
            readiness(1, [3, 3, 3, 3, 3]),
            readiness(2, [4, 3, 4, 3, 4]),
            readiness(3, [4, 3, 4, 3, 3]),
        ];
        let outcome = Aggregator::default()
            .aggregate(TestCategory::NeuromuscularReadiness, &records, now())
            .unwrap();

        assert_eq!(outcome.metrics.average_score, 65.0);
        let performance: Vec<&Recommendation> = outcome
            .recommendations
            .iter()
            .filter(|r| r.category == "performance")
            .collect();
        assert_eq!(performance.len(), 1);
        assert_eq!(performance[0].priority, Priority::High);
        assert_eq!(outcome.recommendations.len(), 1);
    }

    #[test]
    fn test_two_tests_give_one_frequency_entry() {
        // Excellent T-Test times keep the performance rule quiet
        let records = vec![
            record(TestType::TTest, 0, json!({"completionTime": 9.0})),
            record(TestType::TTest, 1, json!({"completionTime": 9.0})),
        ];
        let outcome = Aggregator::default()
            .aggregate(TestCategory::SpeedAgility, &records, now())
            .unwrap();

        assert_eq!(outcome.metrics.total_tests, 2);
        assert_eq!(outcome.metrics.consistency_score, 100.0);
        let frequency = outcome
            .recommendations
            .iter()
            .filter(|r| r.category == "frequency")
            .count();
        assert_eq!(frequency, 1);
        assert_eq!(outcome.recommendations.len(), 1);
    }

    #[test]
    fn test_out_of_order_records_fail_fast() {
        let mut records = illinois(&[17.0, 16.5, 16.0]);
        records.swap(1, 2);
        records[1].recorded_at = start() + Duration::days(5);
        records[2].recorded_at = start() + Duration::days(3);

        let err = Aggregator::default()
            .aggregate(TestCategory::SpeedAgility, &records, now())
            .unwrap_err();
        assert_eq!(err, AggregationError::OutOfOrder { index: 2 });
    }

    #[test]
    fn test_other_categories_are_ignored() {
        let records = vec![readiness(0, [4, 4, 4, 4, 4]), jump(1, 55.0), jump(2, 65.0)];
        let outcome = Aggregator::default()
            .aggregate(TestCategory::AnaerobicPower, &records, now())
            .unwrap();

        assert_eq!(outcome.metrics.total_tests, 2);
        assert_eq!(outcome.metrics.best_performance, 65.0);
        assert_eq!(outcome.metrics.worst_performance, 55.0);
        assert!(!outcome.test_ids.contains_key(&TestType::DailyReadiness));
    }

    #[test]
    fn test_reaction_majority_of_three_metrics() {
        // Faster and more consistent but less accurate
        let older = json!({"lightTrials": [
            {"reactionTime": 200, "accuracy": true},
            {"reactionTime": 400, "accuracy": true}
        ]});
        let recent = json!({"lightTrials": [
            {"reactionTime": 250, "accuracy": true},
            {"reactionTime": 252, "accuracy": false}
        ]});
        let mut records = vec![record(TestType::SimpleReactionTime, 0, older)];
        for day in 1..=5 {
            records.push(record(TestType::SimpleReactionTime, day, recent.clone()));
        }

        let outcome = Aggregator::default()
            .aggregate(TestCategory::ReactionCoordination, &records, now())
            .unwrap();
        let t = &outcome.trends.metric_trends;
        assert_eq!(t[&MetricKind::ReactionTime], Trend::Improving);
        assert_eq!(t[&MetricKind::Accuracy], Trend::Declining);
        assert_eq!(t[&MetricKind::Consistency], Trend::Improving);
        assert_eq!(outcome.trends.overall_trend, Trend::Improving);

        let categories: Vec<&str> = outcome
            .recommendations
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert!(categories.contains(&"accuracy"));
    }

    #[test]
    fn test_metric_missing_from_a_window_stays_stable() {
        let mut records = illinois(&[17.0]);
        for day in 1..=5 {
            records.push(record(TestType::TTest, day, json!({"completionTime": 10.0})));
        }

        let outcome = Aggregator::default()
            .aggregate(TestCategory::SpeedAgility, &records, now())
            .unwrap();
        assert_eq!(outcome.metrics.total_tests, 6);
        assert_eq!(outcome.metrics.improvement_rate, 0);
        assert_eq!(outcome.trends.overall_trend, Trend::Stable);
        assert_eq!(outcome.trends.consistency_trend, Trend::Stable);
        assert_eq!(
            outcome.trends.metric_trends[&MetricKind::CompletionTime],
            Trend::Stable
        );
    }

    #[test]
    fn test_reflex_only_recent_window_has_no_reaction_trend() {
        let mut records = vec![record(
            TestType::SimpleReactionTime,
            0,
            json!({"lightTrials": [250, 260]}),
        )];
        for day in 1..=5 {
            records.push(record(
                TestType::VestibuloOcularReflex,
                day,
                json!({"headVelocity": 100, "eyeVelocity": 95}),
            ));
        }

        let outcome = Aggregator::default()
            .aggregate(TestCategory::ReactionCoordination, &records, now())
            .unwrap();
        assert_eq!(outcome.metrics.improvement_rate, 0);
        assert_eq!(outcome.trends.overall_trend, Trend::Stable);
        assert!(outcome.trends.metric_trends.values().all(|t| *t == Trend::Stable));
        assert!(outcome.recommendations.iter().all(|r| r.category != "trend"));
    }

    #[test]
    fn test_overall_ranks_categories() {
        let mut records = Vec::new();
        for i in 0..6 {
            let time = if i == 0 { 18.0 } else { 16.0 };
            records.push(record(
                TestType::IllinoisAgilityTest,
                i * 2,
                json!({"completionTime": time, "gender": "male"}),
            ));
            let height = if i == 0 { 60.0 } else { 54.0 };
            records.push(jump(i * 2 + 1, height));
        }
        records.push(readiness(20, [4, 4, 4, 4, 4]));

        let outcome = Aggregator::default()
            .aggregate(TestCategory::Overall, &records, now())
            .unwrap();

        assert_eq!(outcome.metrics.total_tests, 13);
        assert_eq!(outcome.trends.fastest_improving, Some(TestCategory::SpeedAgility));
        assert_eq!(outcome.trends.slowest_improving, Some(TestCategory::AnaerobicPower));
        assert_eq!(outcome.test_ids.len(), 3);
    }

    #[test]
    fn test_into_summary_keeps_window() {
        let records = vec![jump(0, 50.0)];
        let window = AnalyticsPeriod::Month.bounds(now());
        let summary = Aggregator::default()
            .aggregate(TestCategory::AnaerobicPower, &records, now())
            .unwrap()
            .into_summary("athlete-1", AnalyticsPeriod::Month, TestCategory::AnaerobicPower, window);

        assert_eq!(summary.start_date, window.0);
        assert_eq!(summary.end_date, window.1);
        assert_eq!(summary.metrics.total_tests, 1);
    }

    #[test]
    fn test_consistency_score_edges() {
        assert_eq!(consistency_score(&[]), 100.0);
        assert_eq!(consistency_score(&[42.0]), 100.0);
        assert_eq!(consistency_score(&[10.0, 10.0]), 100.0);
        assert_eq!(consistency_score(&[1.0, 100.0]), 2.0);
        assert_eq!(consistency_score(&[1.0, 1000.0]), 0.0);
    }

    #[test]
    fn test_mean_treats_non_finite_as_zero() {
        assert_eq!(mean_or_zero(&[]), 0.0);
        assert_eq!(mean_or_zero(&[f64::NAN, 4.0]), 2.0);
    }

    proptest! {
        #[test]
        fn test_short_history_never_trends(heights in prop::collection::vec(20.0f64..90.0, 1..=5)) {
            let records: Vec<TestRecord> = heights
                .iter()
                .enumerate()
                .map(|(i, h)| jump(i as i64, *h))
                .collect();
            let outcome = Aggregator::default()
                .aggregate(TestCategory::AnaerobicPower, &records, now())
                .unwrap();

            prop_assert_eq!(outcome.metrics.improvement_rate, 0);
            prop_assert_eq!(outcome.trends.overall_trend, Trend::Stable);
            prop_assert_eq!(outcome.metrics.total_tests, heights.len());
        }
    }
}

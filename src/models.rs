use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidInputError;
use crate::inputs::RawInputs;
use crate::normalize::MetricNormalizer;

/// The closed set of tests the platform records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestType {
    DailyReadiness,
    CustomObstacleCircuit,
    #[serde(rename = "IOCT")]
    Ioct,
    SimpleReactionTime,
    VestibuloOcularReflex,
    HReflex,
    #[serde(rename = "DTR")]
    DeepTendonReflex,
    MaxRunupSpeed,
    #[serde(rename = "YoYoIR")]
    YoYoIntermittentRecovery,
    IllinoisAgilityTest,
    Agility505,
    TTest,
    TimingGates,
    VerticalJump,
    BroadJump,
    TimeToPeakForce,
    WingateAnaerobicTest,
    FlightTest,
    MentalNeuralSession,
    CooperTest,
    #[serde(rename = "HRFAssessment")]
    HrfAssessment,
}

impl TestType {
    pub const ALL: [TestType; 21] = [
        TestType::DailyReadiness,
        TestType::CustomObstacleCircuit,
        TestType::Ioct,
        TestType::SimpleReactionTime,
        TestType::VestibuloOcularReflex,
        TestType::HReflex,
        TestType::DeepTendonReflex,
        TestType::MaxRunupSpeed,
        TestType::YoYoIntermittentRecovery,
        TestType::IllinoisAgilityTest,
        TestType::Agility505,
        TestType::TTest,
        TestType::TimingGates,
        TestType::VerticalJump,
        TestType::BroadJump,
        TestType::TimeToPeakForce,
        TestType::WingateAnaerobicTest,
        TestType::FlightTest,
        TestType::MentalNeuralSession,
        TestType::CooperTest,
        TestType::HrfAssessment,
    ];

    /// Category this test rolls up into
    pub fn category(&self) -> TestCategory {
        match self {
            TestType::DailyReadiness => TestCategory::NeuromuscularReadiness,
            TestType::CustomObstacleCircuit | TestType::Ioct => TestCategory::FunctionalFitness,
            TestType::SimpleReactionTime
            | TestType::VestibuloOcularReflex
            | TestType::HReflex
            | TestType::DeepTendonReflex => TestCategory::ReactionCoordination,
            TestType::MaxRunupSpeed
            | TestType::YoYoIntermittentRecovery
            | TestType::IllinoisAgilityTest
            | TestType::Agility505
            | TestType::TTest
            | TestType::TimingGates => TestCategory::SpeedAgility,
            TestType::VerticalJump
            | TestType::BroadJump
            | TestType::TimeToPeakForce
            | TestType::WingateAnaerobicTest
            | TestType::FlightTest => TestCategory::AnaerobicPower,
            TestType::MentalNeuralSession => TestCategory::MentalNeural,
            TestType::CooperTest | TestType::HrfAssessment => TestCategory::HealthRelatedFitness,
        }
    }

    /// Stable kebab-case identifier used on the command line and in script paths
    pub fn slug(&self) -> &'static str {
        match self {
            TestType::DailyReadiness => "daily-readiness",
            TestType::CustomObstacleCircuit => "custom-obstacle-circuit",
            TestType::Ioct => "ioct",
            TestType::SimpleReactionTime => "simple-reaction-time",
            TestType::VestibuloOcularReflex => "vestibulo-ocular-reflex",
            TestType::HReflex => "h-reflex",
            TestType::DeepTendonReflex => "dtr",
            TestType::MaxRunupSpeed => "max-runup-speed",
            TestType::YoYoIntermittentRecovery => "yo-yo-ir",
            TestType::IllinoisAgilityTest => "illinois-agility",
            TestType::Agility505 => "agility-505",
            TestType::TTest => "t-test",
            TestType::TimingGates => "timing-gates",
            TestType::VerticalJump => "vertical-jump",
            TestType::BroadJump => "broad-jump",
            TestType::TimeToPeakForce => "time-to-peak-force",
            TestType::WingateAnaerobicTest => "wingate",
            TestType::FlightTest => "flight-test",
            TestType::MentalNeuralSession => "mental-neural-session",
            TestType::CooperTest => "cooper-test",
            TestType::HrfAssessment => "hrf-assessment",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::DailyReadiness => "Daily Readiness",
            TestType::CustomObstacleCircuit => "Custom Obstacle Circuit",
            TestType::Ioct => "Indoor Obstacle Course Test",
            TestType::SimpleReactionTime => "Simple Reaction Time",
            TestType::VestibuloOcularReflex => "Vestibulo-Ocular Reflex",
            TestType::HReflex => "H-Reflex",
            TestType::DeepTendonReflex => "Deep Tendon Reflex",
            TestType::MaxRunupSpeed => "Max Run-up Speed",
            TestType::YoYoIntermittentRecovery => "Yo-Yo Intermittent Recovery",
            TestType::IllinoisAgilityTest => "Illinois Agility Test",
            TestType::Agility505 => "505 Agility",
            TestType::TTest => "T-Test",
            TestType::TimingGates => "Timing Gates",
            TestType::VerticalJump => "Vertical Jump",
            TestType::BroadJump => "Broad Jump",
            TestType::TimeToPeakForce => "Time to Peak Force",
            TestType::WingateAnaerobicTest => "Wingate Anaerobic Test",
            TestType::FlightTest => "Flight Test",
            TestType::MentalNeuralSession => "Mental-Neural Training Session",
            TestType::CooperTest => "Cooper 12-Minute Run",
            TestType::HrfAssessment => "Health-Related Fitness Assessment",
        }
    }

    /// Model name as it appears in stored documents
    pub fn model_name(&self) -> &'static str {
        match self {
            TestType::Ioct => "IOCT",
            TestType::DeepTendonReflex => "DTR",
            TestType::YoYoIntermittentRecovery => "YoYoIR",
            TestType::HrfAssessment => "HRFAssessment",
            other => other.variant_name(),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            TestType::DailyReadiness => "DailyReadiness",
            TestType::CustomObstacleCircuit => "CustomObstacleCircuit",
            TestType::Ioct => "Ioct",
            TestType::SimpleReactionTime => "SimpleReactionTime",
            TestType::VestibuloOcularReflex => "VestibuloOcularReflex",
            TestType::HReflex => "HReflex",
            TestType::DeepTendonReflex => "DeepTendonReflex",
            TestType::MaxRunupSpeed => "MaxRunupSpeed",
            TestType::YoYoIntermittentRecovery => "YoYoIntermittentRecovery",
            TestType::IllinoisAgilityTest => "IllinoisAgilityTest",
            TestType::Agility505 => "Agility505",
            TestType::TTest => "TTest",
            TestType::TimingGates => "TimingGates",
            TestType::VerticalJump => "VerticalJump",
            TestType::BroadJump => "BroadJump",
            TestType::TimeToPeakForce => "TimeToPeakForce",
            TestType::WingateAnaerobicTest => "WingateAnaerobicTest",
            TestType::FlightTest => "FlightTest",
            TestType::MentalNeuralSession => "MentalNeuralSession",
            TestType::CooperTest => "CooperTest",
            TestType::HrfAssessment => "HrfAssessment",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for TestType {
    type Err = String;

    /// Accepts the slug, the stored model name or the variant name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TestType::ALL
            .iter()
            .copied()
            .find(|t| {
                t.slug() == wanted
                    || t.model_name().to_lowercase() == wanted
                    || t.variant_name().to_lowercase() == wanted
            })
            .ok_or_else(|| format!("Unknown test type: {}", s))
    }
}

/// Analytics category; every test type belongs to exactly one non-overall category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    NeuromuscularReadiness,
    FunctionalFitness,
    ReactionCoordination,
    SpeedAgility,
    AnaerobicPower,
    MentalNeural,
    HealthRelatedFitness,
    Overall,
}

impl TestCategory {
    /// The categories tests are recorded under
    pub const TESTED: [TestCategory; 7] = [
        TestCategory::NeuromuscularReadiness,
        TestCategory::FunctionalFitness,
        TestCategory::ReactionCoordination,
        TestCategory::SpeedAgility,
        TestCategory::AnaerobicPower,
        TestCategory::MentalNeural,
        TestCategory::HealthRelatedFitness,
    ];

    pub fn includes(&self, test_type: TestType) -> bool {
        *self == TestCategory::Overall || test_type.category() == *self
    }

    /// Scalars compared between the recent and older windows; the first is primary
    pub fn tracked_metrics(&self) -> &'static [MetricKind] {
        match self {
            TestCategory::NeuromuscularReadiness => &[MetricKind::Readiness],
            TestCategory::FunctionalFitness => &[MetricKind::AdjustedTime],
            TestCategory::ReactionCoordination | TestCategory::MentalNeural => &[
                MetricKind::ReactionTime,
                MetricKind::Accuracy,
                MetricKind::Consistency,
            ],
            TestCategory::SpeedAgility => &[MetricKind::CompletionTime],
            TestCategory::AnaerobicPower => &[MetricKind::JumpHeight],
            TestCategory::HealthRelatedFitness => &[MetricKind::Vo2Max],
            TestCategory::Overall => &[MetricKind::Score],
        }
    }

    pub fn primary_metric(&self) -> MetricKind {
        self.tracked_metrics()[0]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::NeuromuscularReadiness => "neuromuscular_readiness",
            TestCategory::FunctionalFitness => "functional_fitness",
            TestCategory::ReactionCoordination => "reaction_coordination",
            TestCategory::SpeedAgility => "speed_agility",
            TestCategory::AnaerobicPower => "anaerobic_power",
            TestCategory::MentalNeural => "mental_neural",
            TestCategory::HealthRelatedFitness => "health_related_fitness",
            TestCategory::Overall => "overall",
        }
    }

    /// Lowercase words for use inside sentences
    pub fn phrase(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        TestCategory::TESTED
            .iter()
            .chain(std::iter::once(&TestCategory::Overall))
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Whether smaller or larger values are the better result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Scalars the aggregator can track across records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Per-record score on a 0-100 scale
    Score,
    /// Readiness percentage
    Readiness,
    /// Penalty-adjusted obstacle time (s)
    AdjustedTime,
    /// Combined average reaction time (ms)
    ReactionTime,
    /// Share of accurate reaction trials (%)
    Accuracy,
    /// Reaction consistency score (0-100)
    Consistency,
    /// Illinois agility completion time (s)
    CompletionTime,
    /// Jump height (cm)
    JumpHeight,
    /// Estimated aerobic capacity (ml/kg/min)
    Vo2Max,
}

impl MetricKind {
    pub fn direction(&self) -> Direction {
        match self {
            MetricKind::AdjustedTime | MetricKind::ReactionTime | MetricKind::CompletionTime => {
                Direction::LowerIsBetter
            }
            _ => Direction::HigherIsBetter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Score => "score",
            MetricKind::Readiness => "readiness",
            MetricKind::AdjustedTime => "adjusted_time",
            MetricKind::ReactionTime => "reaction_time",
            MetricKind::Accuracy => "accuracy",
            MetricKind::Consistency => "consistency",
            MetricKind::CompletionTime => "completion_time",
            MetricKind::JumpHeight => "jump_height",
            MetricKind::Vo2Max => "vo2_max",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Athlete gender, used to pick gender-specific threshold ladders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

/// Discretized performance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Average => "average",
            Rating::BelowAverage => "below_average",
            Rating::Poor => "poor",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of change between two windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rating, coarse percentile and trend attached to every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub rating: Rating,
    pub percentile: u8,
    pub trend: Trend,
}

impl Default for Performance {
    /// Assigned to tests without a threshold ladder
    fn default() -> Self {
        Performance {
            rating: Rating::Average,
            percentile: 50,
            trend: Trend::Stable,
        }
    }
}

/// Values computed from the raw inputs; `None` serializes as null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivedFields(BTreeMap<String, Option<f64>>);

impl DerivedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; non-finite numbers are stored as null
    pub fn insert(&mut self, name: &str, value: Option<f64>) {
        self.0
            .insert(name.to_string(), value.filter(|v| v.is_finite()));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<f64>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One completed measurement event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Unique identifier
    pub id: String,

    /// Opaque athlete identifier
    pub athlete_id: String,

    pub test_type: TestType,

    /// When the test was performed
    pub recorded_at: DateTime<Utc>,

    /// Raw submitted inputs
    pub inputs: RawInputs,

    /// Computed by the normalizer
    pub derived: DerivedFields,

    /// Categorical outcome such as readiness status or PASS/FAIL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    pub performance: Performance,

    /// Opaque output of an external protocol script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,
}

impl TestRecord {
    /// Build a record, computing derived fields and performance from `inputs`.
    ///
    /// `recorded_at` is truncated to whole microseconds, the precision it is
    /// stored and ordered with.
    pub fn new(
        athlete_id: impl Into<String>,
        test_type: TestType,
        recorded_at: DateTime<Utc>,
        inputs: RawInputs,
        normalizer: &MetricNormalizer,
    ) -> Result<Self, InvalidInputError> {
        let normalized = normalizer.normalize(test_type, &inputs)?;

        Ok(TestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            athlete_id: athlete_id.into(),
            test_type,
            recorded_at: recorded_at.trunc_subsecs(6),
            inputs,
            derived: normalized.derived,
            status: normalized.status,
            performance: normalized.performance,
            protocol_output: None,
            notes: None,
            coach_id: None,
        })
    }

    /// Replace the raw inputs and recompute everything derived from them.
    ///
    /// The previously assigned trend is kept; it depends on history, not inputs.
    pub fn replace_inputs(
        &mut self,
        inputs: RawInputs,
        normalizer: &MetricNormalizer,
    ) -> Result<(), InvalidInputError> {
        let normalized = normalizer.normalize(self.test_type, &inputs)?;
        let trend = self.performance.trend;

        self.inputs = inputs;
        self.derived = normalized.derived;
        self.status = normalized.status;
        self.performance = Performance {
            trend,
            ..normalized.performance
        };
        Ok(())
    }

    pub fn category(&self) -> TestCategory {
        self.test_type.category()
    }

    /// Look up a named value, preferring derived fields over raw inputs
    pub fn value(&self, field: &str) -> Option<f64> {
        self.derived
            .get(field)
            .or_else(|| self.inputs.number(field))
            .filter(|v| v.is_finite())
    }

    /// Per-record score on a 0-100 scale
    pub fn score(&self) -> f64 {
        match self.test_type {
            TestType::DailyReadiness => self.derived.get("readinessPercentage"),
            TestType::SimpleReactionTime | TestType::MentalNeuralSession => {
                self.derived.get("score")
            }
            _ => None,
        }
        .unwrap_or(self.performance.percentile as f64)
    }

    /// Value of a tracked metric, if this test type produces it
    pub fn metric(&self, kind: MetricKind) -> Option<f64> {
        match (kind, self.test_type) {
            (MetricKind::Score, _) => Some(self.score()),
            (MetricKind::Readiness, TestType::DailyReadiness) => {
                self.value("readinessPercentage")
            }
            (MetricKind::AdjustedTime, TestType::CustomObstacleCircuit) => {
                self.value("finalAdjustedTime")
            }
            (MetricKind::AdjustedTime, TestType::Ioct) => self.value("totalTime"),
            (MetricKind::ReactionTime, TestType::SimpleReactionTime) => {
                self.value("combinedAvgTime")
            }
            (MetricKind::Accuracy, TestType::SimpleReactionTime) => self.value("accuracy"),
            (MetricKind::Consistency, TestType::SimpleReactionTime) => {
                self.value("consistencyScore")
            }
            (MetricKind::CompletionTime, TestType::IllinoisAgilityTest) => {
                self.value("completionTime")
            }
            (MetricKind::JumpHeight, TestType::VerticalJump | TestType::FlightTest) => {
                self.value("jumpHeight")
            }
            (MetricKind::ReactionTime, TestType::MentalNeuralSession) => {
                self.value("avgReactionTime")
            }
            (MetricKind::Accuracy, TestType::MentalNeuralSession) => self.value("accuracy"),
            (MetricKind::Consistency, TestType::MentalNeuralSession) => {
                self.value("consistencyScore")
            }
            (MetricKind::Vo2Max, TestType::CooperTest | TestType::HrfAssessment) => {
                self.value("vo2Max")
            }
            _ => None,
        }
    }
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Actionable advice synthesized from aggregate metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub action_items: Vec<String>,
}

/// Length of an analytics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl AnalyticsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsPeriod::Week => "week",
            AnalyticsPeriod::Month => "month",
            AnalyticsPeriod::Quarter => "quarter",
            AnalyticsPeriod::Year => "year",
        }
    }
}

impl fmt::Display for AnalyticsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalyticsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(AnalyticsPeriod::Week),
            "month" => Ok(AnalyticsPeriod::Month),
            "quarter" => Ok(AnalyticsPeriod::Quarter),
            "year" => Ok(AnalyticsPeriod::Year),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

/// Aggregate statistics over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub total_tests: usize,
    /// Mean per-record score (0-100)
    pub average_score: f64,
    /// Signed percent change of the primary metric, positive = improvement
    pub improvement_rate: i64,
    pub consistency_score: f64,
    /// Best primary-metric value in its natural unit
    pub best_performance: f64,
    /// Worst primary-metric value in its natural unit
    pub worst_performance: f64,
}

/// Trend classifications over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTrends {
    pub overall_trend: Trend,
    pub consistency_trend: Trend,
    pub metric_trends: BTreeMap<MetricKind, Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_improving: Option<TestCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowest_improving: Option<TestCategory>,
}

/// Rollup over one athlete's records for one category and window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub id: String,
    pub athlete_id: String,
    pub period: AnalyticsPeriod,
    pub category: TestCategory,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub metrics: AnalyticsMetrics,
    pub trends: AnalyticsTrends,
    pub recommendations: Vec<Recommendation>,
    /// Contributing record ids, by test type
    pub test_ids: BTreeMap<TestType, Vec<String>>,
    pub generated_at: DateTime<Utc>,
}

//! Orchestration over the normalizer, aggregator and store
//!
//! [`TestingService`] is the single entry point the CLI talks to. It owns the
//! database handle and applies the configured thresholds and analytics tuning.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::fs;
use tracing::{info, instrument};

use crate::analytics::trend::history_trend;
use crate::analytics::{dashboard, Aggregator, DashboardStats};
use crate::config::AppConfig;
use crate::database::{Database, RecordQuery, DRILLS};
use crate::drills::{Drill, DrillQuery};
use crate::error::{AthlabError, DatabaseError, Result};
use crate::hrf::HrfCatalog;
use crate::inputs::RawInputs;
use crate::models::{
    AnalyticsPeriod, AnalyticsSummary, Direction, TestCategory, TestRecord, TestType, Trend,
};
use crate::normalize::MetricNormalizer;

/// Previous same-type records a new record's trend is compared against
pub const HISTORY_DEPTH: usize = 5;

/// A test submission before normalization
#[derive(Debug, Clone)]
pub struct NewTest {
    pub athlete_id: String,
    pub test_type: TestType,
    /// Defaults to the submission time
    pub recorded_at: Option<DateTime<Utc>>,
    pub inputs: RawInputs,
    pub notes: Option<String>,
    pub coach_id: Option<String>,
}

impl NewTest {
    pub fn new(athlete_id: impl Into<String>, test_type: TestType, inputs: RawInputs) -> Self {
        Self {
            athlete_id: athlete_id.into(),
            test_type,
            recorded_at: None,
            inputs,
            notes: None,
            coach_id: None,
        }
    }

    pub fn at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }
}

pub struct TestingService {
    db: Database,
    normalizer: MetricNormalizer,
    aggregator: Aggregator,
}

impl TestingService {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        Self {
            db,
            normalizer: MetricNormalizer::with_thresholds(config.threshold_table())
                .with_hrf_catalog(config.hrf_catalog()),
            aggregator: Aggregator::new(config.analytics.clone()),
        }
    }

    /// Open the configured database, creating its directory if needed
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AthlabError::Configuration(format!("{:#}", e)))?;

        let path = config.database_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(Database::new(&path)?, config))
    }

    pub fn normalizer(&self) -> &MetricNormalizer {
        &self.normalizer
    }

    pub fn hrf_catalog(&self) -> &HrfCatalog {
        self.normalizer.hrf_catalog()
    }

    /// A session's drill and an assessment's definition must exist
    fn check_references(&self, test_type: TestType, inputs: &RawInputs) -> Result<()> {
        let missing = match test_type {
            TestType::MentalNeuralSession => inputs
                .text("drillId")
                .map(|id| self.db.get_drill(id).map(|d| d.is_none().then(|| (DRILLS, id))))
                .transpose()?
                .flatten(),
            TestType::HrfAssessment => inputs
                .text("testId")
                .filter(|id| self.hrf_catalog().get(id).is_none())
                .map(|id| ("hrf_tests", id)),
            _ => None,
        };

        match missing {
            Some((table, id)) => Err(DatabaseError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Normalize, classify against history and persist a new record
    #[instrument(skip(self, test), fields(athlete = %test.athlete_id, test_type = %test.test_type))]
    pub fn submit(&self, test: NewTest) -> Result<TestRecord> {
        self.check_references(test.test_type, &test.inputs)?;
        let recorded_at = test.recorded_at.unwrap_or_else(Utc::now);
        let mut record = TestRecord::new(
            test.athlete_id,
            test.test_type,
            recorded_at,
            test.inputs,
            &self.normalizer,
        )?;
        record.notes = test.notes;
        record.coach_id = test.coach_id;
        record.performance.trend = self.history_trend(&record)?;

        self.db.insert_record(&record)?;
        info!(
            id = %record.id,
            rating = %record.performance.rating,
            trend = %record.performance.trend,
            "Recorded test"
        );
        Ok(record)
    }

    /// Replace a record's inputs and recompute everything derived from them
    #[instrument(skip(self, inputs))]
    pub fn update(&self, id: &str, inputs: RawInputs) -> Result<TestRecord> {
        let mut record = self.get(id)?;
        self.check_references(record.test_type, &inputs)?;
        record.replace_inputs(inputs, &self.normalizer)?;
        record.performance.trend = self.history_trend(&record)?;

        self.db.update_record(&record)?;
        info!(rating = %record.performance.rating, "Updated test");
        Ok(record)
    }

    /// Update notes without touching inputs
    pub fn annotate(&self, id: &str, notes: Option<String>) -> Result<TestRecord> {
        let mut record = self.get(id)?;
        record.notes = notes;
        self.db.update_record(&record)?;
        Ok(record)
    }

    /// Store the output of an external protocol script on a record
    pub fn attach_protocol_output(&self, id: &str, output: Value) -> Result<TestRecord> {
        let mut record = self.get(id)?;
        record.protocol_output = Some(output);
        self.db.update_record(&record)?;
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<TestRecord> {
        self.db.get_record(id)?.ok_or_else(|| {
            DatabaseError::NotFound {
                table: "test_records".to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    pub fn list(&self, query: &RecordQuery) -> Result<Vec<TestRecord>> {
        Ok(self.db.find_records(query)?)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.db.delete_record(id)?;
        info!(id, "Deleted test");
        Ok(())
    }

    pub fn create_drill(&self, drill: Drill) -> Result<Drill> {
        self.db.insert_drill(&drill)?;
        info!(id = %drill.id, name = %drill.name, "Created drill");
        Ok(drill)
    }

    pub fn get_drill(&self, id: &str) -> Result<Drill> {
        self.db.get_drill(id)?.ok_or_else(|| {
            DatabaseError::NotFound {
                table: DRILLS.to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    pub fn list_drills(&self, query: &DrillQuery) -> Result<Vec<Drill>> {
        Ok(self.db.find_drills(query)?)
    }

    /// Apply `change` to a stored drill and persist it
    pub fn update_drill(&self, id: &str, change: impl FnOnce(&mut Drill)) -> Result<Drill> {
        let mut drill = self.get_drill(id)?;
        change(&mut drill);
        drill.id = id.to_string();
        drill.touch();

        self.db.update_drill(&drill)?;
        info!(id, "Updated drill");
        Ok(drill)
    }

    /// Sessions already recorded against the drill keep their `drillId`
    pub fn delete_drill(&self, id: &str) -> Result<()> {
        self.db.delete_drill(id)?;
        info!(id, "Deleted drill");
        Ok(())
    }

    /// Aggregate the window containing `now` and persist the summary
    #[instrument(skip(self, now))]
    pub fn generate_analytics(
        &self,
        athlete_id: &str,
        period: AnalyticsPeriod,
        category: TestCategory,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSummary> {
        let (start, end) = period.bounds(now);
        let records = self.db.find_records(
            &RecordQuery::for_athlete(athlete_id)
                .category(category)
                .between(start, end),
        )?;

        let summary = self
            .aggregator
            .aggregate(category, &records, now)?
            .into_summary(athlete_id, period, category, (start, end));

        self.db.insert_summary(&summary)?;
        info!(
            id = %summary.id,
            total_tests = summary.metrics.total_tests,
            overall_trend = %summary.trends.overall_trend,
            "Generated analytics"
        );
        Ok(summary)
    }

    pub fn list_analytics(
        &self,
        athlete_id: &str,
        period: Option<AnalyticsPeriod>,
        category: Option<TestCategory>,
    ) -> Result<Vec<AnalyticsSummary>> {
        Ok(self.db.find_summaries(athlete_id, period, category)?)
    }

    /// Dashboard over the trailing `days` ending at `now`
    pub fn dashboard(
        &self,
        athlete_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats> {
        let records = self.db.find_records(
            &RecordQuery::for_athlete(athlete_id).between(now - Duration::days(days as i64), now),
        )?;
        Ok(dashboard(
            &records,
            self.aggregator.config().deadband_pct,
            now,
        ))
    }

    fn ladder_reading(&self, record: &TestRecord) -> Option<(Direction, f64)> {
        let gender = record.inputs.gender().ok().flatten();
        self.normalizer
            .ladder_value(record.test_type, gender, &record.derived, &record.inputs)
            .map(|(entry, value)| (entry.direction, value))
    }

    fn history_trend(&self, record: &TestRecord) -> Result<Trend> {
        let Some((direction, current)) = self.ladder_reading(record) else {
            return Ok(Trend::Stable);
        };

        let previous: Vec<f64> = self
            .db
            .previous_records(
                &record.athlete_id,
                record.test_type,
                &record.recorded_at,
                HISTORY_DEPTH,
            )?
            .iter()
            .filter(|r| r.id != record.id)
            .filter_map(|r| self.ladder_reading(r).map(|(_, value)| value))
            .collect();

        Ok(history_trend(
            current,
            &previous,
            direction,
            self.aggregator.config().deadband_pct,
        ))
    }
}

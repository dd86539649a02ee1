use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, instrument};

use crate::drills::{Drill, DrillQuery};
use crate::error::DatabaseError;
use crate::models::{AnalyticsPeriod, AnalyticsSummary, TestCategory, TestRecord, TestType};

const RECORDS: &str = "test_records";
const SUMMARIES: &str = "analytics_summaries";
pub(crate) const DRILLS: &str = "drills";

/// Timestamps are stored as fixed-width RFC 3339 strings so that text
/// comparison orders them chronologically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Filters for record queries
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub athlete_id: String,
    /// `Overall` behaves like no category filter
    pub category: Option<TestCategory>,
    pub test_type: Option<TestType>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub to: Option<DateTime<Utc>>,
    /// Sessions run against this drill (`inputs.drillId`)
    pub drill_id: Option<String>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn for_athlete(athlete_id: impl Into<String>) -> Self {
        Self {
            athlete_id: athlete_id.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: TestCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn test_type(mut self, test_type: TestType) -> Self {
        self.test_type = Some(test_type);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn drill(mut self, drill_id: impl Into<String>) -> Self {
        self.drill_id = Some(drill_id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = vec!["athlete_id = ?".to_string()];
        let mut values = vec![self.athlete_id.clone()];

        if let Some(category) = self.category.filter(|c| *c != TestCategory::Overall) {
            clauses.push("category = ?".to_string());
            values.push(category.as_str().to_string());
        }
        if let Some(test_type) = self.test_type {
            clauses.push("test_type = ?".to_string());
            values.push(test_type.model_name().to_string());
        }
        if let Some(from) = &self.from {
            clauses.push("recorded_at >= ?".to_string());
            values.push(timestamp(from));
        }
        if let Some(to) = &self.to {
            clauses.push("recorded_at <= ?".to_string());
            values.push(timestamp(to));
        }
        if let Some(drill_id) = &self.drill_id {
            clauses.push("json_extract(document, '$.inputs.drillId') = ?".to_string());
            values.push(drill_id.clone());
        }

        (clauses.join(" AND "), values)
    }
}

/// SQLite document store for test records and analytics summaries
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        // File databases switch to WAL; in-memory ones report "memory"
        let _mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS test_records (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                test_type TEXT NOT NULL,
                category TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_athlete_time
                ON test_records(athlete_id, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_records_athlete_type
                ON test_records(athlete_id, test_type, recorded_at);

            CREATE TABLE IF NOT EXISTS analytics_summaries (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                period TEXT NOT NULL,
                category TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                document TEXT NOT NULL,
                generated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_summaries_athlete
                ON analytics_summaries(athlete_id, period, category, start_date);

            CREATE TABLE IF NOT EXISTS drills (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Store a new test record
    #[instrument(skip(self, record), fields(id = %record.id, test_type = %record.test_type))]
    pub fn insert_record(&self, record: &TestRecord) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(record)?;
        self.conn.execute(
            r#"
            INSERT INTO test_records
                (id, athlete_id, test_type, category, recorded_at, document, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.athlete_id,
                record.test_type.model_name(),
                record.category().as_str(),
                timestamp(&record.recorded_at),
                document,
                timestamp(&Utc::now()),
            ],
        )?;
        debug!("Stored test record");
        Ok(())
    }

    /// Load a record by id
    pub fn get_record(&self, id: &str) -> Result<Option<TestRecord>, DatabaseError> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM test_records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(DatabaseError::from))
            .transpose()
    }

    /// Overwrite an existing record
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub fn update_record(&self, record: &TestRecord) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(record)?;
        let changed = self.conn.execute(
            r#"
            UPDATE test_records
            SET athlete_id = ?2, test_type = ?3, category = ?4, recorded_at = ?5,
                document = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.athlete_id,
                record.test_type.model_name(),
                record.category().as_str(),
                timestamp(&record.recorded_at),
                document,
                timestamp(&Utc::now()),
            ],
        )?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: RECORDS.to_string(),
                id: record.id.clone(),
            });
        }
        Ok(())
    }

    /// Delete a record by id
    pub fn delete_record(&self, id: &str) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute("DELETE FROM test_records WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: RECORDS.to_string(),
                id: id.to_string(),
            });
        }
        debug!(id, "Deleted test record");
        Ok(())
    }

    /// Records matching `query`, oldest first
    pub fn find_records(&self, query: &RecordQuery) -> Result<Vec<TestRecord>, DatabaseError> {
        let (filter, values) = query.where_clause();
        let mut sql = format!(
            "SELECT document FROM test_records WHERE {} ORDER BY recorded_at ASC, id ASC",
            filter
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        self.documents(&sql, values)
    }

    /// Up to `limit` records of one type recorded strictly before `before`, oldest first
    pub fn previous_records(
        &self,
        athlete_id: &str,
        test_type: TestType,
        before: &DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TestRecord>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT document FROM test_records
            WHERE athlete_id = ? AND test_type = ? AND recorded_at < ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT {}
            "#,
            limit
        );
        let values = vec![
            athlete_id.to_string(),
            test_type.model_name().to_string(),
            timestamp(before),
        ];

        let mut records: Vec<TestRecord> = self.documents(&sql, values)?;
        records.reverse();
        Ok(records)
    }

    /// Store an analytics summary
    #[instrument(skip(self, summary), fields(id = %summary.id, category = %summary.category))]
    pub fn insert_summary(&self, summary: &AnalyticsSummary) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(summary)?;
        self.conn.execute(
            r#"
            INSERT INTO analytics_summaries
                (id, athlete_id, period, category, start_date, end_date, document, generated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                summary.id,
                summary.athlete_id,
                summary.period.as_str(),
                summary.category.as_str(),
                timestamp(&summary.start_date),
                timestamp(&summary.end_date),
                document,
                timestamp(&summary.generated_at),
            ],
        )?;
        debug!("Stored analytics summary");
        Ok(())
    }

    /// Summaries for an athlete, newest window first
    pub fn find_summaries(
        &self,
        athlete_id: &str,
        period: Option<AnalyticsPeriod>,
        category: Option<TestCategory>,
    ) -> Result<Vec<AnalyticsSummary>, DatabaseError> {
        let mut clauses = vec!["athlete_id = ?"];
        let mut values = vec![athlete_id.to_string()];

        if let Some(period) = period {
            clauses.push("period = ?");
            values.push(period.as_str().to_string());
        }
        if let Some(category) = category {
            clauses.push("category = ?");
            values.push(category.as_str().to_string());
        }

        let sql = format!(
            "SELECT document FROM analytics_summaries WHERE {} \
             ORDER BY start_date DESC, generated_at DESC",
            clauses.join(" AND ")
        );
        self.documents(&sql, values)
    }

    /// Load a summary by id
    pub fn get_summary(&self, id: &str) -> Result<AnalyticsSummary, DatabaseError> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM analytics_summaries WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Err(DatabaseError::NotFound {
                table: SUMMARIES.to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Store a new drill
    #[instrument(skip(self, drill), fields(id = %drill.id, category = %drill.category))]
    pub fn insert_drill(&self, drill: &Drill) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(drill)?;
        self.conn.execute(
            r#"
            INSERT INTO drills (id, name, category, difficulty, is_active, document, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                drill.id,
                drill.name,
                drill.category.as_str(),
                drill.difficulty.as_str(),
                drill.is_active,
                document,
                timestamp(&drill.created_at),
            ],
        )?;
        debug!("Stored drill");
        Ok(())
    }

    pub fn get_drill(&self, id: &str) -> Result<Option<Drill>, DatabaseError> {
        let document: Option<String> = self
            .conn
            .query_row("SELECT document FROM drills WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(DatabaseError::from))
            .transpose()
    }

    #[instrument(skip(self, drill), fields(id = %drill.id))]
    pub fn update_drill(&self, drill: &Drill) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(drill)?;
        let changed = self.conn.execute(
            r#"
            UPDATE drills
            SET name = ?2, category = ?3, difficulty = ?4, is_active = ?5, document = ?6
            WHERE id = ?1
            "#,
            params![
                drill.id,
                drill.name,
                drill.category.as_str(),
                drill.difficulty.as_str(),
                drill.is_active,
                document,
            ],
        )?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: DRILLS.to_string(),
                id: drill.id.clone(),
            });
        }
        Ok(())
    }

    pub fn delete_drill(&self, id: &str) -> Result<(), DatabaseError> {
        let changed = self.conn.execute("DELETE FROM drills WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: DRILLS.to_string(),
                id: id.to_string(),
            });
        }
        debug!(id, "Deleted drill");
        Ok(())
    }

    /// Drills matching `query`, newest first
    pub fn find_drills(&self, query: &DrillQuery) -> Result<Vec<Drill>, DatabaseError> {
        let mut clauses = vec!["1 = 1"];
        let mut values = Vec::new();

        if let Some(category) = query.category {
            clauses.push("category = ?");
            values.push(category.as_str().to_string());
        }
        if let Some(difficulty) = query.difficulty {
            clauses.push("difficulty = ?");
            values.push(difficulty.as_str().to_string());
        }
        if query.active_only {
            clauses.push("is_active = 1");
        }

        let sql = format!(
            "SELECT document FROM drills WHERE {} ORDER BY created_at DESC, id ASC",
            clauses.join(" AND ")
        );
        self.documents(&sql, values)
    }

    fn documents<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
        values: Vec<String>,
    ) -> Result<Vec<T>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeSet;
use std::io::Write;

use crate::error::ExportError;
use crate::models::{AnalyticsSummary, TestRecord};

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn optional(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

const RECORD_COLUMNS: [&str; 10] = [
    "id",
    "athlete_id",
    "test_type",
    "category",
    "recorded_at",
    "rating",
    "percentile",
    "trend",
    "status",
    "notes",
];

/// One row per record; derived fields become trailing columns, unioned across records
pub fn write_records<W: Write>(records: &[TestRecord], writer: W) -> Result<(), ExportError> {
    let derived: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.derived.iter().map(|(name, _)| name.as_str()))
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RECORD_COLUMNS.iter().copied().chain(derived.iter().copied()))?;

    for record in records {
        let mut row = vec![
            record.id.clone(),
            record.athlete_id.clone(),
            record.test_type.model_name().to_string(),
            record.category().as_str().to_string(),
            timestamp(&record.recorded_at),
            record.performance.rating.as_str().to_string(),
            record.performance.percentile.to_string(),
            record.performance.trend.as_str().to_string(),
            record.status.clone().unwrap_or_default(),
            record.notes.clone().unwrap_or_default(),
        ];
        row.extend(derived.iter().map(|name| optional(record.derived.get(name))));
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// One row per summary with the headline metrics and recommendation titles
pub fn write_summaries<W: Write>(
    summaries: &[AnalyticsSummary],
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "id",
        "athlete_id",
        "period",
        "category",
        "start_date",
        "end_date",
        "total_tests",
        "average_score",
        "improvement_rate",
        "consistency_score",
        "best_performance",
        "worst_performance",
        "overall_trend",
        "consistency_trend",
        "recommendations",
    ])?;

    for summary in summaries {
        let m = &summary.metrics;
        let titles: Vec<&str> = summary
            .recommendations
            .iter()
            .map(|r| r.title.as_str())
            .collect();

        wtr.write_record([
            summary.id.clone(),
            summary.athlete_id.clone(),
            summary.period.as_str().to_string(),
            summary.category.as_str().to_string(),
            timestamp(&summary.start_date),
            timestamp(&summary.end_date),
            m.total_tests.to_string(),
            m.average_score.to_string(),
            m.improvement_rate.to_string(),
            m.consistency_score.to_string(),
            m.best_performance.to_string(),
            m.worst_performance.to_string(),
            summary.trends.overall_trend.as_str().to_string(),
            summary.trends.consistency_trend.as_str().to_string(),
            titles.join("; "),
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

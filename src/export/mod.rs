use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::ExportError;
use crate::models::{AnalyticsSummary, TestRecord};

pub mod csv;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ExportError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write test records to `path`
pub fn export_records(
    records: &[TestRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let writer = create(path)?;
    match format {
        ExportFormat::Csv => csv::write_records(records, writer)?,
        ExportFormat::Json => json::write_json(&records, writer)?,
    }
    info!(count = records.len(), path = %path.display(), "Exported test records");
    Ok(())
}

/// Write analytics summaries to `path`
pub fn export_summaries(
    summaries: &[AnalyticsSummary],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let writer = create(path)?;
    match format {
        ExportFormat::Csv => csv::write_summaries(summaries, writer)?,
        ExportFormat::Json => json::write_json(&summaries, writer)?,
    }
    info!(count = summaries.len(), path = %path.display(), "Exported analytics summaries");
    Ok(())
}

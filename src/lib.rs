// Library interface for athlab modules
// The binary and the integration tests both build on this

pub mod analytics;
pub mod config;
pub mod database;
pub mod drills;
pub mod error;
pub mod export;
pub mod formula;
pub mod hrf;
pub mod inputs;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod runner;
pub mod service;
pub mod thresholds;

// Re-export commonly used types for convenience
pub use models::*;
pub use analytics::{Aggregator, AggregateOutcome, DashboardStats};
pub use config::AppConfig;
pub use database::{Database, RecordQuery};
pub use drills::{Drill, DrillQuery};
pub use error::{AthlabError, InvalidInputError, Result};
pub use hrf::{HrfCatalog, HrfTestDefinition};
pub use inputs::RawInputs;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use normalize::{MetricNormalizer, Normalized};
pub use runner::ProtocolRunner;
pub use service::{NewTest, TestingService};
pub use thresholds::{ThresholdEntry, ThresholdTable};

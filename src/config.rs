use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hrf::{HrfCatalog, HrfTestDefinition};
use crate::logging::LogConfig;
use crate::thresholds::{ThresholdEntry, ThresholdTable};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// Storage locations and defaults
    #[serde(default)]
    pub settings: AppSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,

    /// Rollup windows, deadband and recommendation cutoffs
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// External protocol script execution
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Threshold ladders replacing or extending the built-in table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<ThresholdEntry>,

    /// Assessment definitions replacing or extending the built-in catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hrf_tests: Vec<HrfTestDefinition>,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// SQLite database file; defaults to `athlab.db` inside `data_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Look-back used by `list` and `dashboard` when no range is given
    pub default_window_days: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: home_dir().join(".athlab").join("data"),
            database_path: None,
            default_window_days: 30,
        }
    }
}

/// Aggregator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Size of the recent sub-window
    pub recent_window: usize,

    /// Relative change, in percent, below which a difference is noise
    pub deadband_pct: f64,

    /// Average score under which a performance recommendation is emitted
    pub performance_cutoff: f64,

    /// Reaction accuracy under which an accuracy recommendation is emitted
    pub accuracy_cutoff: f64,

    /// Consistency score under which a consistency recommendation is emitted
    pub consistency_cutoff: f64,

    /// Test count under which a frequency recommendation is emitted
    pub min_tests: usize,

    /// Minimum records for a category to compete for fastest/slowest improving
    pub min_history: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            recent_window: 5,
            deadband_pct: 5.0,
            performance_cutoff: 70.0,
            accuracy_cutoff: 80.0,
            consistency_cutoff: 60.0,
            min_tests: 3,
            min_history: 6,
        }
    }
}

/// Protocol script execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter used to run protocol scripts
    pub interpreter: String,

    /// Root directory holding `<category>/<test>.py` scripts
    pub script_dir: PathBuf,

    /// Seconds before a script is killed
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script_dir: home_dir().join(".athlab").join("protocols"),
            timeout_secs: 30,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            metadata: ConfigMetadata::default(),
            settings: AppSettings::default(),
            logging: LogConfig::default(),
            analytics: AnalyticsConfig::default(),
            runner: RunnerConfig::default(),
            thresholds: Vec::new(),
            hrf_tests: Vec::new(),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        home_dir().join(".athlab").join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Ignoring unreadable config {}: {:#}",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Reject settings the aggregator and runner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.analytics.recent_window == 0 {
            bail!("analytics.recent_window must be at least 1");
        }
        if !(self.analytics.deadband_pct.is_finite() && self.analytics.deadband_pct >= 0.0) {
            bail!("analytics.deadband_pct must be a non-negative number");
        }
        if self.runner.timeout_secs == 0 {
            bail!("runner.timeout_secs must be at least 1");
        }
        self.hrf_catalog()
            .validate()
            .context("Invalid hrf_tests definition")?;
        Ok(())
    }

    /// Resolved SQLite database location
    pub fn database_path(&self) -> PathBuf {
        self.settings
            .database_path
            .clone()
            .unwrap_or_else(|| self.settings.data_dir.join("athlab.db"))
    }

    /// Built-in ladders with this configuration's overrides applied
    pub fn threshold_table(&self) -> ThresholdTable {
        let mut table = ThresholdTable::default();
        table.merge(self.thresholds.iter().cloned());
        table
    }

    /// Built-in assessment catalog with this configuration's definitions merged in
    pub fn hrf_catalog(&self) -> HrfCatalog {
        let mut catalog = HrfCatalog::default();
        catalog.merge(self.hrf_tests.iter().cloned());
        catalog
    }
}

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use athlab::analytics::DashboardStats;
use athlab::config::AppConfig;
use athlab::database::RecordQuery;
use athlab::drills::{Difficulty, Drill, DrillCategory, DrillQuery};
use athlab::error::AthlabError;
use athlab::export::{self, ExportFormat};
use athlab::logging::{init_logging, LogLevel};
use athlab::models::{
    AnalyticsPeriod, AnalyticsSummary, Direction, Rating, TestCategory, TestRecord, TestType,
    Trend,
};
use athlab::runner::{self, ProtocolRunner};
use athlab::service::{NewTest, TestingService};
use athlab::RawInputs;

/// athlab - Athlete Testing Analytics CLI
///
/// Records physical performance tests, rates them against fixed ladders and
/// rolls them up into per-category trend summaries with recommendations.
#[derive(Parser)]
#[command(name = "athlab")]
#[command(version)]
#[command(about = "Athlete testing metrics and analytics", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a completed test
    Record {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Test type (e.g. vertical-jump, illinois-agility, mental-neural-session, hrf-assessment)
        #[arg(short, long)]
        test: TestType,

        /// Raw inputs as a JSON object
        #[arg(short, long, conflicts_with = "input_file")]
        inputs: Option<String>,

        /// Read raw inputs from a JSON file
        #[arg(long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// When the test was performed (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        at: Option<String>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Coach ID
        #[arg(long)]
        coach: Option<String>,
    },

    /// Replace the inputs of a recorded test
    Update {
        /// Test record ID
        id: String,

        /// Raw inputs as a JSON object
        #[arg(short, long, conflicts_with = "input_file")]
        inputs: Option<String>,

        /// Read raw inputs from a JSON file
        #[arg(long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// Replace the notes instead of the inputs
        #[arg(short, long, conflicts_with_all = ["inputs", "input_file"])]
        notes: Option<String>,
    },

    /// Show one recorded test
    Show {
        /// Test record ID
        id: String,

        /// Print the stored JSON document
        #[arg(long)]
        json: bool,
    },

    /// List recorded tests
    List {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Restrict to one category
        #[arg(short, long)]
        category: Option<TestCategory>,

        /// Restrict to one test type
        #[arg(short, long)]
        test: Option<TestType>,

        /// Start date (RFC 3339 or YYYY-MM-DD)
        #[arg(short, long)]
        from: Option<String>,

        /// End date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Only sessions run against this drill
        #[arg(long)]
        drill: Option<String>,

        /// Maximum number of tests to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a recorded test
    Delete {
        /// Test record ID
        id: String,
    },

    /// Run the external protocol script for a recorded test and store its output
    Execute {
        /// Test record ID
        id: String,

        /// Script to run instead of the conventional one
        #[arg(short, long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// Extra metadata passed to the script as JSON
        #[arg(short, long)]
        meta: Option<String>,
    },

    /// Generate and store an analytics summary
    Analyze {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Analytics period (week, month, quarter, year)
        #[arg(short, long, default_value = "month")]
        period: AnalyticsPeriod,

        /// Category to analyze
        #[arg(short, long, default_value = "overall")]
        category: TestCategory,

        /// Reference time for the window (default now)
        #[arg(long)]
        at: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored analytics summaries
    Summaries {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Filter by period
        #[arg(short, long)]
        period: Option<AnalyticsPeriod>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<TestCategory>,
    },

    /// Show dashboard statistics
    Dashboard {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Look-back window in days (default from config)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Export tests or summaries
    Export {
        /// Athlete ID
        #[arg(short, long)]
        athlete: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json); inferred from the extension when omitted
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Export analytics summaries instead of tests
        #[arg(long)]
        summaries: bool,

        /// Start date for tests (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date for tests (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Manage mental-neural training drills
    Drill {
        #[command(subcommand)]
        action: DrillAction,
    },

    /// Show the health-related fitness assessment catalog
    Assessments {
        /// Show the fields and calculations of one assessment
        id: Option<String>,
    },

    /// Show the active threshold ladders
    Thresholds {
        /// Restrict to one test type
        #[arg(short, long)]
        test: Option<TestType>,
    },

    /// Manage configuration
    Config {
        /// Print the active configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,

        /// Print the configuration file path
        #[arg(short, long)]
        path: bool,
    },
}

#[derive(Subcommand)]
enum DrillAction {
    /// Add a drill to the catalog
    Add {
        /// Drill name
        #[arg(short, long)]
        name: String,

        /// Category (reaction, focus, coordination, memory, dual_task, attention, processing_speed)
        #[arg(short, long)]
        category: DrillCategory,

        /// Difficulty (beginner, intermediate, advanced)
        #[arg(short, long, default_value = "beginner")]
        difficulty: Difficulty,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Trials per session
        #[arg(long)]
        trials: Option<u32>,
    },

    /// List drills, newest first
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<DrillCategory>,

        /// Filter by difficulty
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Hide inactive drills
        #[arg(long)]
        active: bool,
    },

    /// Show one drill
    Show {
        /// Drill ID
        id: String,

        /// Print the stored JSON document
        #[arg(long)]
        json: bool,
    },

    /// Change a drill
    Update {
        /// Drill ID
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        trials: Option<u32>,

        /// Mark active (true) or retired (false)
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a drill
    Delete {
        /// Drill ID
        id: String,
    },
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Test")]
    test: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Pct")]
    percentile: u8,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&TestRecord> for RecordRow {
    fn from(record: &TestRecord) -> Self {
        Self {
            id: record.id.clone(),
            date: record.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
            test: record.test_type.display_name().to_string(),
            rating: record.performance.rating.as_str().to_string(),
            percentile: record.performance.percentile,
            trend: record.performance.trend.as_str().to_string(),
            status: record.status.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Tests")]
    tests: usize,
    #[tabled(rename = "Avg score")]
    average: f64,
    #[tabled(rename = "Improvement %")]
    improvement: i64,
    #[tabled(rename = "Trend")]
    trend: String,
}

#[derive(Tabled)]
struct LadderRow {
    #[tabled(rename = "Test")]
    test: String,
    #[tabled(rename = "Gender")]
    gender: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Better")]
    direction: &'static str,
    #[tabled(rename = "Excellent")]
    excellent: f64,
    #[tabled(rename = "Good")]
    good: f64,
    #[tabled(rename = "Average")]
    average: f64,
    #[tabled(rename = "Below avg")]
    below_average: f64,
}

#[derive(Tabled)]
struct DrillRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Difficulty")]
    difficulty: String,
    #[tabled(rename = "Trials")]
    trials: u32,
    #[tabled(rename = "Active")]
    active: bool,
}

impl From<&Drill> for DrillRow {
    fn from(drill: &Drill) -> Self {
        Self {
            id: drill.id.clone(),
            name: drill.name.clone(),
            category: drill.category.to_string(),
            difficulty: drill.difficulty.to_string(),
            trials: drill.config.trials,
            active: drill.is_active,
        }
    }
}

#[derive(Tabled)]
struct AssessmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Fields")]
    fields: usize,
    #[tabled(rename = "Calculations")]
    calculations: String,
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn colored_rating(rating: Rating) -> ColoredString {
    match rating {
        Rating::Excellent => rating.as_str().green().bold(),
        Rating::Good => rating.as_str().green(),
        Rating::Average => rating.as_str().yellow(),
        Rating::BelowAverage => rating.as_str().red(),
        Rating::Poor => rating.as_str().red().bold(),
    }
}

fn colored_trend(trend: Trend) -> ColoredString {
    match trend {
        Trend::Improving => trend.as_str().green(),
        Trend::Declining => trend.as_str().red(),
        Trend::Stable => trend.as_str().normal(),
    }
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC)
fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected RFC 3339 or YYYY-MM-DD", value))?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// End-of-day for plain dates so `--to 2024-05-31` includes that day
fn parse_end_time(value: &str) -> Result<DateTime<Utc>> {
    let at = parse_time(value)?;
    if DateTime::parse_from_rfc3339(value).is_ok() {
        Ok(at)
    } else {
        Ok(at + chrono::Duration::days(1) - chrono::Duration::microseconds(1))
    }
}

fn read_inputs(inline: Option<String>, file: Option<PathBuf>) -> Result<RawInputs> {
    let text = match (inline, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read inputs from {}", path.display()))?,
        (None, None) => bail!("Provide --inputs or --input-file"),
    };
    let value: Value = serde_json::from_str(&text).context("Inputs are not valid JSON")?;
    Ok(RawInputs::from_value(value).map_err(AthlabError::from)?)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(path),
        None => Ok(AppConfig::load_or_default()),
    }
}

fn print_record(record: &TestRecord) {
    println!(
        "{} {} {}",
        record.test_type.display_name().bold(),
        "for".dimmed(),
        record.athlete_id
    );
    println!("  ID:          {}", record.id);
    println!("  Recorded:    {}", record.recorded_at.to_rfc3339());
    println!(
        "  Performance: {} ({}th percentile, {})",
        colored_rating(record.performance.rating),
        record.performance.percentile,
        colored_trend(record.performance.trend)
    );
    if let Some(status) = &record.status {
        println!("  Status:      {}", status.cyan());
    }
    if let Some(notes) = &record.notes {
        println!("  Notes:       {}", notes);
    }

    let rows: Vec<FieldRow> = record
        .derived
        .iter()
        .map(|(field, value)| FieldRow {
            field: field.clone(),
            value: value.map_or("-".to_string(), |v| format!("{:.2}", v)),
        })
        .collect();
    if !rows.is_empty() {
        print_table(rows);
    }
    if let Some(output) = &record.protocol_output {
        println!("  Protocol output: {}", output);
    }
}

fn print_summary(summary: &AnalyticsSummary) {
    let m = &summary.metrics;
    println!(
        "{} {} {} ({} to {})",
        "Analytics".bold(),
        summary.category,
        summary.period,
        summary.start_date.format("%Y-%m-%d"),
        summary.end_date.format("%Y-%m-%d")
    );
    println!("  Tests:            {}", m.total_tests);
    println!("  Average score:    {}", m.average_score);
    println!("  Improvement rate: {}%", m.improvement_rate);
    println!("  Consistency:      {}", m.consistency_score);
    println!(
        "  Best / worst:     {} / {}",
        m.best_performance, m.worst_performance
    );
    println!(
        "  Trend:            {} (consistency {})",
        colored_trend(summary.trends.overall_trend),
        colored_trend(summary.trends.consistency_trend)
    );
    for (metric, trend) in &summary.trends.metric_trends {
        println!("    {:<16} {}", metric.label(), colored_trend(*trend));
    }
    if let Some(fastest) = summary.trends.fastest_improving {
        println!("  Fastest improving: {}", fastest);
    }
    if let Some(slowest) = summary.trends.slowest_improving {
        println!("  Slowest improving: {}", slowest);
    }

    if summary.recommendations.is_empty() {
        println!("{}", "✓ No recommendations".green());
    }
    for rec in &summary.recommendations {
        println!();
        println!("  [{}] {}", rec.priority.to_string().yellow(), rec.title.bold());
        println!("  {}", rec.description);
        for item in &rec.action_items {
            println!("    - {}", item);
        }
    }
}

fn print_dashboard(stats: &DashboardStats) {
    println!("{} ({} tests)", "Dashboard".bold(), stats.total_tests);
    for (category, count) in &stats.category_breakdown {
        println!("  {:<24} {}", category.as_str(), count);
    }
    let recent = &stats.recent_performance;
    println!();
    println!(
        "  Readiness:     {:>6}%  {}",
        recent.avg_readiness,
        colored_trend(stats.trends.readiness)
    );
    println!(
        "  Reaction time: {:>6}ms {}",
        recent.avg_reaction_time,
        colored_trend(stats.trends.reaction)
    );
    println!(
        "  Agility time:  {:>6}s  {}",
        recent.avg_agility_time,
        colored_trend(stats.trends.agility)
    );
    println!(
        "  Jump height:   {:>6}cm {}",
        recent.avg_jump_height,
        colored_trend(stats.trends.power)
    );
}

fn print_drill(drill: &Drill) {
    println!("{} ({})", drill.name.bold(), drill.category);
    println!("  ID:         {}", drill.id);
    println!("  Difficulty: {}", drill.difficulty);
    if !drill.description.is_empty() {
        println!("  About:      {}", drill.description);
    }
    println!(
        "  Session:    {} trials, {}ms timeout, target {}% / {}ms",
        drill.config.trials,
        drill.config.response_timeout,
        drill.config.target_accuracy,
        drill.config.target_reaction_time
    );
    let norm = drill.norm();
    println!(
        "  Norm:       {}ms avg, {}% accuracy, {}s",
        norm.avg_reaction_time, norm.accuracy, norm.completion_time
    );
    if !drill.is_active {
        println!("  {}", "retired".yellow());
    }
}

fn manage_drills(service: &TestingService, action: DrillAction) -> Result<()> {
    match action {
        DrillAction::Add {
            name,
            category,
            difficulty,
            description,
            trials,
        } => {
            let mut drill = Drill::new(name, category)
                .map_err(AthlabError::from)?
                .with_difficulty(difficulty)
                .with_description(description.unwrap_or_default());
            drill.config.difficulty = difficulty;
            if let Some(trials) = trials {
                drill.config.trials = trials;
            }
            let drill = service.create_drill(drill)?;
            println!("{}", "✓ Drill added".green().bold());
            print_drill(&drill);
        }

        DrillAction::List {
            category,
            difficulty,
            active,
        } => {
            let query = DrillQuery {
                category,
                difficulty,
                active_only: active,
            };
            let drills = service.list_drills(&query)?;
            if drills.is_empty() {
                println!("{}", "No drills found".yellow());
            } else {
                print_table(drills.iter().map(DrillRow::from).collect());
            }
        }

        DrillAction::Show { id, json } => {
            let drill = service.get_drill(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&drill)?);
            } else {
                print_drill(&drill);
            }
        }

        DrillAction::Update {
            id,
            name,
            difficulty,
            description,
            trials,
            active,
        } => {
            if name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                bail!("Drill name cannot be empty");
            }
            let drill = service.update_drill(&id, |drill| {
                if let Some(name) = name {
                    drill.name = name;
                }
                if let Some(difficulty) = difficulty {
                    drill.difficulty = difficulty;
                }
                if let Some(description) = description {
                    drill.description = description;
                }
                if let Some(trials) = trials {
                    drill.config.trials = trials;
                }
                if let Some(active) = active {
                    drill.is_active = active;
                }
            })?;
            println!("{}", "✓ Drill updated".green().bold());
            print_drill(&drill);
        }

        DrillAction::Delete { id } => {
            service.delete_drill(&id)?;
            println!("{} {}", "✓ Deleted".green(), id);
        }
    }
    Ok(())
}

fn show_assessments(service: &TestingService, id: Option<String>) -> Result<()> {
    let catalog = service.hrf_catalog();
    let Some(id) = id else {
        let rows: Vec<AssessmentRow> = catalog
            .tests()
            .iter()
            .map(|t| AssessmentRow {
                id: t.id.clone(),
                name: t.name.clone(),
                category: t.category.to_string(),
                fields: t.data_fields.len(),
                calculations: t
                    .calculations
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();
        print_table(rows);
        return Ok(());
    };

    let Some(test) = catalog.get(&id) else {
        bail!("No assessment is defined as {}", id);
    };
    println!("{} ({})", test.name.bold(), test.category);
    if !test.description.is_empty() {
        println!("  {}", test.description);
    }
    for field in &test.data_fields {
        let unit = field.unit.as_deref().unwrap_or("");
        let required = if field.required { "required" } else { "optional" };
        println!(
            "  {:<16} {:?} {} {}",
            field.id,
            field.kind,
            unit,
            required.dimmed()
        );
    }
    for calc in &test.calculations {
        println!("  {} = {} {}", calc.id.cyan(), calc.formula, calc.unit);
    }
    Ok(())
}

fn manage_config(custom: Option<PathBuf>, show: bool, init: bool, path: bool) -> Result<()> {
    let config_path = custom
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    if path {
        println!("{}", config_path.display());
    }
    if init {
        if config_path.exists() {
            bail!("{} already exists", config_path.display());
        }
        AppConfig::default().save_to_file(&config_path)?;
        println!("{} {}", "✓ Wrote".green(), config_path.display());
    }
    if show || !(path || init) {
        let config = load_config(custom.as_deref())?;
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_file,
        verbose,
        command,
    } = cli;

    if let Commands::Config { show, init, path } = command {
        return manage_config(config_file, show, init, path);
    }

    let mut config = load_config(config_file.as_deref())?;
    config.logging.level = LogLevel::from_verbosity(config.logging.level, verbose);
    init_logging(&config.logging)?;

    let service = TestingService::from_config(&config)?;

    match command {
        Commands::Record {
            athlete,
            test,
            inputs,
            input_file,
            at,
            notes,
            coach,
        } => {
            let mut submission = NewTest::new(athlete, test, read_inputs(inputs, input_file)?);
            submission.recorded_at = at.as_deref().map(parse_time).transpose()?;
            submission.notes = notes;
            submission.coach_id = coach;

            let record = service.submit(submission)?;
            println!("{}", "✓ Test recorded".green().bold());
            print_record(&record);
        }

        Commands::Update {
            id,
            inputs,
            input_file,
            notes,
        } => {
            let record = match notes {
                Some(notes) => service.annotate(&id, Some(notes))?,
                None => service.update(&id, read_inputs(inputs, input_file)?)?,
            };
            println!("{}", "✓ Test updated".green().bold());
            print_record(&record);
        }

        Commands::Show { id, json } => {
            let record = service.get(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }

        Commands::List {
            athlete,
            category,
            test,
            from,
            to,
            drill,
            limit,
        } => {
            let mut query = RecordQuery::for_athlete(athlete);
            query.category = category;
            query.test_type = test;
            query.drill_id = drill;
            query.from = from.as_deref().map(parse_time).transpose()?;
            query.to = to.as_deref().map(parse_end_time).transpose()?;
            query.limit = limit;

            let records = service.list(&query)?;
            if records.is_empty() {
                println!("{}", "No tests found".yellow());
            } else {
                print_table(records.iter().map(RecordRow::from).collect());
            }
        }

        Commands::Delete { id } => {
            service.delete(&id)?;
            println!("{} {}", "✓ Deleted".green(), id);
        }

        Commands::Execute { id, script, meta } => {
            let record = service.get(&id)?;
            let meta = meta
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .context("--meta is not valid JSON")?;

            let protocol = ProtocolRunner::new(&config.runner);
            let script = script.unwrap_or_else(|| protocol.script_for(record.test_type));
            let payload = runner::payload(record.test_type, &record.inputs, meta);

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let output = rt
                .block_on(protocol.run_script(&script, &payload))
                .map_err(AthlabError::from)?;

            let record = service.attach_protocol_output(&id, output)?;
            println!("{}", "✓ Protocol executed".green().bold());
            print_record(&record);
        }

        Commands::Analyze {
            athlete,
            period,
            category,
            at,
            json,
        } => {
            let now = at.as_deref().map(parse_time).transpose()?.unwrap_or_else(Utc::now);
            let summary = service.generate_analytics(&athlete, period, category, now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Summaries {
            athlete,
            period,
            category,
        } => {
            let summaries = service.list_analytics(&athlete, period, category)?;
            if summaries.is_empty() {
                println!("{}", "No summaries found".yellow());
            } else {
                let rows = summaries
                    .iter()
                    .map(|s| SummaryRow {
                        start: s.start_date.format("%Y-%m-%d").to_string(),
                        period: s.period.to_string(),
                        category: s.category.to_string(),
                        tests: s.metrics.total_tests,
                        average: s.metrics.average_score,
                        improvement: s.metrics.improvement_rate,
                        trend: s.trends.overall_trend.to_string(),
                    })
                    .collect();
                print_table::<SummaryRow>(rows);
            }
        }

        Commands::Dashboard { athlete, days } => {
            let days = days.unwrap_or(config.settings.default_window_days);
            let stats = service.dashboard(&athlete, days, Utc::now())?;
            print_dashboard(&stats);
        }

        Commands::Export {
            athlete,
            output,
            format,
            summaries,
            from,
            to,
        } => {
            let format = match format {
                Some(f) => f.parse::<ExportFormat>()?,
                None => ExportFormat::from_path(&output)?,
            };

            if summaries {
                let data = service.list_analytics(&athlete, None, None)?;
                export::export_summaries(&data, format, &output)?;
                println!("{} {} summaries", "✓ Exported".green(), data.len());
            } else {
                let mut query = RecordQuery::for_athlete(athlete);
                query.from = from.as_deref().map(parse_time).transpose()?;
                query.to = to.as_deref().map(parse_end_time).transpose()?;
                let data = service.list(&query)?;
                export::export_records(&data, format, &output)?;
                println!("{} {} tests", "✓ Exported".green(), data.len());
            }
        }

        Commands::Drill { action } => manage_drills(&service, action)?,

        Commands::Assessments { id } => show_assessments(&service, id)?,

        Commands::Thresholds { test } => {
            let rows: Vec<LadderRow> = service
                .normalizer()
                .thresholds()
                .entries()
                .iter()
                .filter(|e| test.map_or(true, |t| t == e.test_type))
                .map(|e| LadderRow {
                    test: e.test_type.display_name().to_string(),
                    gender: e
                        .gender
                        .map_or("any".to_string(), |g| format!("{:?}", g).to_lowercase()),
                    metric: e.metric.clone(),
                    direction: match e.direction {
                        Direction::LowerIsBetter => "lower",
                        Direction::HigherIsBetter => "higher",
                    },
                    excellent: e.tiers.excellent,
                    good: e.tiers.good,
                    average: e.tiers.average,
                    below_average: e.tiers.below_average,
                })
                .collect();
            print_table(rows);
        }

        // Answered before the database is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<AthlabError>() {
            Some(app_err) => {
                tracing::event!(
                    tracing::Level::ERROR,
                    severity = ?app_err.severity(),
                    status = app_err.status_code(),
                    "{}",
                    app_err
                );
                eprintln!("{} {}", "Error:".red().bold(), app_err.user_message());
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

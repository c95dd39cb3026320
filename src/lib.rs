use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use thiserror::Error;

pub mod calendar;
pub mod filter;
pub mod render;
pub mod weekly;

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by all fallible operations within this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to decode events: {0}")]
    Json(#[from] serde_json::Error),
    #[error("calendar error: {0}")]
    Calendar(#[from] calendar::google::ClientError),
    #[error("failed to parse run event: {0}")]
    Parse(#[from] filter::ParseError),
    #[error("no run events found; cannot compute weekly or per-run averages")]
    EmptyData,
    #[error(
        "no time has elapsed between the first run on {first_run} and {today}; \
         cannot compute the average weekly mileage"
    )]
    ZeroElapsedTime {
        first_run: NaiveDate,
        today: NaiveDate,
    },
}

fn default_graph_interval() -> f64 {
    0.5
}

/// Settings consumed by the weekly aggregation and the report renderer.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ReportConfig {
    /// Date from which weekly buckets are counted, conventionally the week start before the
    /// first recorded run.
    pub anchor_date: NaiveDate,
    /// Miles represented by a single dot in the weekly graph.
    #[serde(default = "default_graph_interval")]
    pub graph_interval: f64,
    /// Reference date for the report. Defaults to the local current date.
    pub today: Option<NaiveDate>,
}

impl ReportConfig {
    /// Creates a report configuration anchored at `anchor_date` with the default graph interval.
    pub fn new(anchor_date: NaiveDate) -> ReportConfig {
        ReportConfig {
            anchor_date,
            graph_interval: default_graph_interval(),
            today: None,
        }
    }

    /// Checks values that would otherwise produce a meaningless report.
    pub fn validate(&self) -> Result<()> {
        if !self.graph_interval.is_finite() || self.graph_interval <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "graph_interval must be a positive number of miles, got {}",
                self.graph_interval
            )));
        }

        Ok(())
    }

    /// The configured reference date, or today's local date.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn default_lookback_days() -> i64 {
    365
}

fn default_max_results() -> u32 {
    300
}

/// Calendar configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CalendarConfig {
    /// Source for calendar events.
    pub event_source: calendar::EventSourceKind,
    /// Static events, used with the `static` event source.
    #[serde(default)]
    pub events: Vec<calendar::Event>,
    /// Google calendar to query. Falls back to the `GOOGLE_CALENDAR_ID` environment variable.
    pub calendar_id: Option<String>,
    /// How far back to look for logged runs.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Page size used when listing events.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

/// Global application configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AppConfig {
    /// Report configuration section.
    pub report: ReportConfig,
    /// Calendar configuration section.
    pub calendar: CalendarConfig,
}

impl AppConfig {
    /// Loads the application configuration from files in the `config/` directory and environment
    /// variables.
    pub fn load() -> Result<AppConfig> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        log::info!("loading configuration using {} environment", app_env);

        let config: AppConfig = Config::builder()
            // Configuration defaults from `config/default.toml`.
            .add_source(File::with_name("config/default"))
            // Optional environment specific config overrides, e.g. `config/production.toml`.
            .add_source(File::with_name(&format!("config/{}", app_env)).required(false))
            // Optional local config overrides from `config/local.toml` (on .gitignore).
            .add_source(File::with_name("config/local").required(false))
            // Config from environment variables prefixed with `RUNLOG_`.
            .add_source(
                Environment::with_prefix("RUNLOG")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        log::debug!("loaded configuration: {:?}", config);

        config.report.validate()?;

        Ok(config)
    }
}

/// Turns raw calendar events into the rendered text report.
///
/// Runs are extracted from `events`, bucketed into weeks relative to `config.anchor_date` and
/// `today`, and rendered as the run table, the weekly graph and the summary lines.
pub fn report(
    events: &[calendar::Event],
    config: &ReportConfig,
    today: NaiveDate,
) -> Result<String> {
    config.validate()?;

    let runs = filter::extract_runs(events)?;

    log::info!("found {} runs in {} events", runs.len(), events.len());

    let report = weekly::summarize(config, today, runs)?;

    Ok(render::render_report(&report, config))
}

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;

use runlog::calendar::{Calendar, StaticEventSource};
use runlog::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Weekly mileage report from runs logged in a calendar", long_about = None)]
struct Cli {
    /// Date the weekly buckets are counted from, usually the Sunday before the first run
    #[arg(long, value_name = "YYYY-MM-DD", env = "RUNLOG_ANCHOR_DATE")]
    anchor_date: Option<NaiveDate>,

    /// Miles represented by each dot in the weekly graph
    #[arg(long, value_name = "MILES", env = "RUNLOG_GRAPH_INTERVAL")]
    graph_interval: Option<f64>,

    /// Report as of this date instead of today
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,

    /// Read events from a JSON file instead of the configured event source
    #[arg(long, value_name = "FILE")]
    events_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The report goes to stdout, so only warnings and errors are logged by default.
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    dotenv().ok();

    let cli = Cli::parse();

    let mut config = AppConfig::load().context("failed to load configuration")?;

    if let Some(anchor_date) = cli.anchor_date {
        config.report.anchor_date = anchor_date;
    }
    if let Some(graph_interval) = cli.graph_interval {
        config.report.graph_interval = graph_interval;
    }
    if cli.today.is_some() {
        config.report.today = cli.today;
    }

    let calendar = match &cli.events_file {
        Some(events_file) => {
            log::info!("loading calendar events from {}", events_file.display());
            Calendar::new(StaticEventSource::from_path(events_file)?)
        }
        None => {
            println!(
                "Getting all runs logged in the past {} days:",
                config.calendar.lookback_days
            );
            Calendar::from_config(&config.calendar).await?
        }
    };

    let events = calendar
        .fetch_events()
        .await
        .context("failed to fetch calendar events")?;

    if events.is_empty() {
        println!("No calendar events found.");
    }

    let today = config.report.today();
    let report = runlog::report(&events, &config.report, today)?;

    print!("{report}");

    Ok(())
}

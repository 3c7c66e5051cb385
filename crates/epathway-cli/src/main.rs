use std::path::PathBuf;
use std::process;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use epathway::extractor::AddressMode;
use epathway::types::{DevelopmentApplication, RunSummary};
use epathway::{
    HttpTransport, MemoryStore, ScrapeConfig, Scraper, ScraperError, SqliteStore, Store,
    UpsertPolicy,
};
use log::LevelFilter;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "epathway")]
#[command(
    about = "Scrapes recent development applications from an ePathway council portal",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        default_value = "data.sqlite",
        help = "SQLite database the applications are stored in"
    )]
    database: PathBuf,

    #[arg(long, help = "Root URL of the ePathway portal")]
    base_url: Option<String>,

    #[arg(
        long,
        default_value_t = 1,
        help = "How many months back from today to search",
        value_parser = clap::value_parser!(u32).range(1..=12)
    )]
    lookback_months: u32,

    #[arg(
        long,
        value_enum,
        default_value = "detail",
        help = "Where addresses are read from"
    )]
    address_mode: AddressModeArg,

    #[arg(
        long,
        help = "Overwrite applications already in the database instead of skipping them"
    )]
    replace_existing: bool,

    #[arg(long, help = "Do not record a comment URL with each application")]
    no_comment_url: bool,

    #[arg(long, help = "Per-request timeout in seconds")]
    timeout_secs: Option<u64>,

    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Run as if today were this date",
        value_parser = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string()),
    )]
    run_date: Option<NaiveDate>,

    #[arg(long, help = "Collect applications in memory instead of writing the database")]
    dry_run: bool,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AddressModeArg {
    Detail,
    Inline,
}

impl From<AddressModeArg> for AddressMode {
    fn from(mode: AddressModeArg) -> Self {
        match mode {
            AddressModeArg::Detail => AddressMode::DetailPage,
            AddressModeArg::Inline => AddressMode::Inline,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: &'a RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [DevelopmentApplication]>,
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail("Error serializing to JSON", e),
    }
}

fn failure_message(context: &str, error: impl std::fmt::Display) -> String {
    format!("{context}: {error}")
}

/// Reports a fatal error on stderr and through the logger, then exits.
fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    let message = failure_message(context, error);
    log::error!("{}", message);
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn scrape_config(cli: &Cli) -> ScrapeConfig {
    let mut config = match &cli.base_url {
        Some(url) => ScrapeConfig::for_portal(url),
        None => ScrapeConfig::default(),
    };
    config.lookback_months = cli.lookback_months;
    config.address_mode = cli.address_mode.into();
    if cli.no_comment_url {
        config.comment_url = None;
    }
    if let Some(date) = cli.run_date {
        config.run_date = date;
    }
    config
}

async fn run<S: Store>(
    scraper: &Scraper<HttpTransport>,
    store: &mut S,
) -> Result<RunSummary, ScraperError> {
    log::info!(
        "Scraping {} for applications lodged in the last {} month(s)",
        scraper.config().base_url,
        scraper.config().lookback_months
    );
    scraper.run(store).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let policy = if cli.replace_existing {
        UpsertPolicy::Replace
    } else {
        UpsertPolicy::Skip
    };

    let transport = HttpTransport::new(cli.timeout_secs.map(Duration::from_secs))
        .unwrap_or_else(|e| fail("Error creating HTTP client", e));
    let scraper = Scraper::new(transport, scrape_config(&cli));

    if cli.dry_run {
        let mut store = MemoryStore::new(policy);
        let summary = run(&scraper, &mut store)
            .await
            .unwrap_or_else(|e| fail("Scrape failed", e));

        match cli.format {
            OutputFormat::Json => serialize_json(&RunReport {
                summary: &summary,
                records: Some(store.records()),
            }),
            OutputFormat::Text => {
                for (i, record) in store.records().iter().enumerate() {
                    println!("{:>3}. {}", i + 1, record);
                }
                print!("{}", summary);
            }
        }
    } else {
        log::info!("Opening database {}", cli.database.display());
        let mut store = SqliteStore::open(&cli.database, policy)
            .unwrap_or_else(|e| fail("Error opening database", e));
        let summary = run(&scraper, &mut store)
            .await
            .unwrap_or_else(|e| fail("Scrape failed", e));

        match cli.format {
            OutputFormat::Json => serialize_json(&RunReport {
                summary: &summary,
                records: None,
            }),
            OutputFormat::Text => print!("{}", summary),
        }
    }

    match cli.format {
        OutputFormat::Json => eprintln!("Complete."),
        OutputFormat::Text => println!("Complete."),
    }
}

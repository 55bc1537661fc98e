use anyhow::Context;
use clap::{CommandFactory, Parser};
use ecourts_scraper::core::config::{load_config, ScraperConfig};
use ecourts_scraper::core::dates;
use ecourts_scraper::features::OutputStore;
use ecourts_scraper::types::{CauseListOutcome, CauseListRequest, ListType};
use ecourts_scraper::{EcourtsScraper, PageDriver, ScraperSession};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RULE: &str = "==================================================";

#[derive(Parser, Debug)]
#[command(
    name = "ecourts",
    version,
    about = "eCourts India scraper: case lookup by CNR and daily cause lists"
)]
struct Cli {
    /// CNR number to search
    #[arg(long)]
    cnr: Option<String>,

    /// Check if the case is listed today
    #[arg(long, requires = "cnr", conflicts_with = "tomorrow")]
    today: bool,

    /// Check if the case is listed tomorrow
    #[arg(long, requires = "cnr")]
    tomorrow: bool,

    /// Download a cause list
    #[arg(long)]
    causelist: bool,

    /// Download cause lists for every court in the complex
    #[arg(long)]
    causelist_all: bool,

    #[arg(long)]
    state: Option<String>,

    #[arg(long)]
    district: Option<String>,

    #[arg(long)]
    court_complex: Option<String>,

    /// Specific court (default: first listed)
    #[arg(long)]
    court_name: Option<String>,

    /// DD-MM-YYYY (default: today)
    #[arg(long)]
    date: Option<String>,

    /// Civil or Criminal
    #[arg(long = "type", default_value = "Civil")]
    list_type: ListType,

    /// Force headless mode regardless of config
    #[arg(long)]
    headless: bool,

    /// Also write the result to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path to ecourts.json
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn cause_list_request(&self) -> Option<CauseListRequest> {
        let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Some(CauseListRequest {
            state: non_empty(&self.state)?,
            district: non_empty(&self.district)?,
            court_complex: non_empty(&self.court_complex)?,
            court_name: non_empty(&self.court_name),
            date: Some(
                non_empty(&self.date)
                    .map(|d| dates::format_date(&d))
                    .unwrap_or_else(dates::today),
            ),
            list_type: self.list_type,
        })
    }
}

/// stderr plus a daily file under `<output>/logs/`.
fn init_logging(config: &ScraperConfig) -> anyhow::Result<PathBuf> {
    let log_dir = OutputStore::new(&config.output_dir).log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let log_path = log_dir.join(format!(
        "ecourts_{}.log",
        chrono::Local::now().format("%Y%m%d")
    ));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(log_path)
}

fn write_output<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    println!("Result written to {}", path.display());
    Ok(())
}

fn print_result<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("\n{}\nRESULTS:\n{}", RULE, RULE);
    println!("{}", serde_json::to_string_pretty(value)?);
    println!("{}", RULE);
    Ok(())
}

fn copy_outcome(outcome: &CauseListOutcome, to: &Path) -> anyhow::Result<()> {
    std::fs::copy(outcome.path(), to)
        .with_context(|| format!("copying {} to {}", outcome.path().display(), to.display()))?;
    println!("Copied to {}", to.display());
    Ok(())
}

async fn run_cnr(cli: &Cli, cnr: &str, scraper: &EcourtsScraper, driver: &dyn PageDriver) -> anyhow::Result<bool> {
    let found = if cli.today {
        println!("\nChecking if case {} is listed today...", cnr);
        scraper.check_case_today(driver, cnr).await.map(serde_json::to_value)
    } else if cli.tomorrow {
        println!("\nChecking if case {} is listed tomorrow...", cnr);
        scraper.check_case_tomorrow(driver, cnr).await.map(serde_json::to_value)
    } else {
        println!("\nSearching for case: {}", cnr);
        scraper.search_by_cnr(driver, cnr).await.map(serde_json::to_value)
    };

    let Some(value) = found.transpose()? else {
        println!("\nNo results found or error occurred.");
        return Ok(false);
    };
    print_result(&value)?;
    if let Some(path) = &cli.output {
        write_output(path, &value)?;
    }
    Ok(true)
}

async fn run_cause_list(
    cli: &Cli,
    request: &CauseListRequest,
    scraper: &EcourtsScraper,
    driver: &dyn PageDriver,
) -> anyhow::Result<bool> {
    println!("\nDownloading cause list:");
    println!("  State: {}", request.state);
    println!("  District: {}", request.district);
    println!("  Court Complex: {}", request.court_complex);
    println!("  Date: {}", request.date.as_deref().unwrap_or_default());
    println!("  Type: {}", request.list_type);

    if cli.causelist_all && request.court_name.is_none() {
        let outcomes = scraper.download_all_cause_lists(driver, request).await;
        if outcomes.is_empty() {
            println!("\n✗ Failed to download cause lists");
            return Ok(false);
        }
        for outcome in &outcomes {
            println!("\n✓ Cause list saved to: {}", outcome.path().display());
        }
        if let Some(dir) = &cli.output {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            for outcome in &outcomes {
                if let Some(name) = outcome.path().file_name() {
                    copy_outcome(outcome, &dir.join(name))?;
                }
            }
        }
        return Ok(true);
    }

    match scraper.download_cause_list(driver, request).await {
        Some(outcome) => {
            println!("\n✓ Cause list saved to: {}", outcome.path().display());
            if let Some(path) = &cli.output {
                copy_outcome(&outcome, path)?;
            }
            Ok(true)
        }
        None => {
            println!("\n✗ Failed to download cause list");
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.cnr.is_none() && !cli.causelist && !cli.causelist_all {
        Cli::command().print_help()?;
        std::process::exit(1);
    }
    let cause_request = if cli.cnr.is_none() {
        match cli.cause_list_request() {
            Some(r) => Some(r),
            None => {
                eprintln!("Error: --state, --district, and --court-complex are required for cause list download");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let mut config = load_config(cli.config.as_deref());
    if cli.headless {
        config.headless = true;
    }
    let log_path = init_logging(&config)?;
    info!("logging to {}", log_path.display());

    let config = Arc::new(config);
    let scraper = EcourtsScraper::from_config(config.clone());

    println!("Initializing eCourts Scraper...");
    let session = ScraperSession::launch(&config)
        .await
        .context("could not start the browser")?;

    let outcome = match (&cli.cnr, &cause_request) {
        (Some(cnr), _) => run_cnr(&cli, cnr.trim(), &scraper, session.driver()).await,
        (None, Some(request)) => run_cause_list(&cli, request, &scraper, session.driver()).await,
        (None, None) => Ok(false),
    };

    println!("\nClosing scraper...");
    session.close().await;
    println!("Done!");

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome.map(|_| ())
}

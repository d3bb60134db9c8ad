//! # newsagg
//!
//! Aggregates the "most viewed" article listings of Greek news sites.
//!
//! ## Features
//!
//! - Reads each site's RSS/Atom feed, falling back to scraping its "most
//!   popular" page (optionally paginated, optionally wrapped in JSON)
//! - Normalizes every item into a uniform article record and caps each
//!   source at `n` items
//! - Fetches sources concurrently with a per-source timeout; a broken site
//!   shows up as an empty list instead of failing the run
//! - Prints a text or JSON listing, or serves an HTML page
//!
//! ## Usage
//!
//! ```sh
//! newsagg -n 5
//! newsagg --format json --config sources.yaml
//! newsagg serve --addr 127.0.0.1:5000
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: the built-in source list or a YAML file
//! 2. **Adapters**: feed parsing or HTML scraping per source
//! 3. **Normalization**: trimmed, validated, deduplicated records
//! 4. **Output**: text, JSON or the HTML web view

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod normalize;
mod outputs;
mod scrapers;
mod utils;
mod web;

use aggregator::Aggregator;
use cli::{Cli, Command, OutputFormat};
use config::{AggregatorConfig, Limit};
use error::ConfigError;
use fetch::Fetch;
use outputs::{html::TEMPLATE_PATH, json, text};

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init --- (stderr, so stdout only carries the listing)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    exit_code(&run(args).await)
}

/// Configuration errors exit with 2, anything else that escapes `run` with 1.
/// Failing sources never get here.
fn exit_code(outcome: &Result<(), Box<dyn Error>>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!(error = %e, "Invalid configuration or input");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "newsagg failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    if args.version {
        println!("{}", version_report(args.config.as_deref()));
        return Ok(());
    }

    let config = prepare_config(&args)?;
    let fetcher = fetch::http_fetcher(&config)?;
    let aggregator = Aggregator::new(config, fetcher)?;

    match args.command {
        Some(Command::Serve { addr }) => web::serve(aggregator, addr).await?,
        None => print!("{}", listing(&aggregator, args.format).await?),
    }
    Ok(())
}

/// The config file (or built-in sources) with the command-line overrides applied.
fn prepare_config(args: &Cli) -> Result<AggregatorConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => AggregatorConfig::load(path)?,
        None => AggregatorConfig::default(),
    };
    if let Some(n) = args.top {
        config.default_limit = Limit::new(n)?.get();
    }
    if args.fetch_previews {
        config.fetch_previews = true;
    }
    info!(
        sources = config.sources.len(),
        default_limit = config.default_limit,
        fetch_previews = config.fetch_previews,
        "Configuration ready"
    );
    Ok(config)
}

/// Aggregate once with the default limit and render the listing.
async fn listing<F: Fetch>(
    aggregator: &Aggregator<F>,
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let result = aggregator.aggregate(aggregator.config().default_limit()).await;
    let rendered = match format {
        OutputFormat::Text => text::render(&result),
        OutputFormat::Json => json::render(&result)? + "\n",
    };
    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = result.total_articles(),
        failed_sources = result.failed_sources(),
        "Execution complete"
    );
    Ok(rendered)
}

/// Version plus the files this binary works with.
fn version_report(config_path: Option<&str>) -> String {
    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "newsagg {}\n  executable: {}\n  config: {}\n  template: {} (embedded)",
        env!("CARGO_PKG_VERSION"),
        exe,
        config_path.unwrap_or("built-in"),
        TEMPLATE_PATH,
    )
}

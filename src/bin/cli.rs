//! Grow A Garden stock CLI
//!
//! One-shot fetches, offline parsing of saved pages, and the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use garden_stock::{
    AppError, Category, Config, FetchError, StockParser, StockScraper,
    error::Result,
    utils::log::{EventSink, default_sink},
};

/// Grow A Garden stock scraper
#[derive(Parser, Debug)]
#[command(
    name = "garden-stock",
    version,
    about = "Scrapes gear, egg and seed stock from the Grow A Garden stock page"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the live page once and print the stock as JSON
    Fetch {
        /// Print only one category (gear, egg, seeds)
        #[arg(long)]
        category: Option<Category>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Extract stock from a saved HTML page
    Parse {
        /// HTML file
        file: PathBuf,

        /// Reference time for countdowns (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        /// Listen address (default: server.bind from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging from the configured level or verbosity flag.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");
    Ok(())
}

/// Print the error envelope and hand the error back for the exit code.
fn report_failure(error: FetchError, compact: bool) -> Result<()> {
    print_json(&error.to_body(), compact)?;
    Err(AppError::Fetch(error))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(&config.logging.level, cli.verbose);

    let events: Arc<dyn EventSink> = default_sink();

    match cli.command {
        Command::Fetch { category, compact } => {
            config.validate()?;
            let scraper = StockScraper::new(&config, events)?;
            log::info!("Fetching {}", config.fetcher.url);

            match scraper.fetch_stock_snapshot().await {
                Ok(snapshot) => match category {
                    Some(category) => print_json(snapshot.category(category), compact)?,
                    None => print_json(&snapshot, compact)?,
                },
                Err(error) => return report_failure(error, compact),
            }
        }

        Command::Parse { file, at, compact } => {
            let html = std::fs::read_to_string(&file)?;
            let parser = StockParser::from_config(&config.selectors, events)?;
            let reference = at.unwrap_or_else(Utc::now);

            match parser.parse(&html, reference) {
                Ok(snapshot) => {
                    log::info!(
                        "Parsed {} items from {}",
                        snapshot.item_count(),
                        file.display()
                    );
                    print_json(&snapshot, compact)?;
                }
                Err(error) => return report_failure(error, compact),
            }
        }

        #[cfg(feature = "server")]
        Command::Serve { bind } => {
            config.validate()?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let scraper = Arc::new(StockScraper::new(&config, Arc::clone(&events))?);
            let state = garden_stock::api::ApiState::new(&config, scraper, events);
            garden_stock::api::serve(&bind, state).await?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} user agents, {} attempts, {}s cache buckets)",
                config.fetcher.user_agents.len(),
                config.fetcher.max_attempts,
                config.cache.bucket_secs
            );
        }
    }

    Ok(())
}

mod config;
mod models;
mod scrapers;
mod storage;
mod training;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{ScrapeConfig, TrainConfig};
use models::{cities, City, CITIES};
use scrapers::fincaraiz::SEARCH_URL;
use scrapers::types::{DEFAULT_ROWS, MAX_PAGES};
use scrapers::FincaRaizScraper;
use std::path::{Path, PathBuf};
use storage::{RunManifest, TableFormat};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fincaraiz-scout")]
#[command(about = "Rental listing scraper and price models for FincaRaíz", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level (RUST_LOG takes precedence)"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        env = "FINCARAIZ_ENDPOINT",
        default_value = SEARCH_URL,
        global = true,
        help = "Search API endpoint"
    )]
    endpoint: String,

    #[arg(
        long,
        env = "FINCARAIZ_DETAIL_ENDPOINT",
        global = true,
        help = "Endpoint for single-listing lookups (defaults to the search endpoint)"
    )]
    detail_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl search results for every city and save the summary rows
    Scrape {
        #[arg(short, long, default_value = "data/raw/propiedades_fincaraiz.csv")]
        output: PathBuf,

        #[arg(long, default_value_t = MAX_PAGES, help = "Maximum pages per city")]
        max_pages: u32,

        #[arg(long, default_value_t = DEFAULT_ROWS, help = "Listings per page")]
        rows: u32,

        #[arg(long = "city", help = "Only crawl these cities (repeatable)")]
        cities: Vec<String>,

        #[arg(long, help = "Save each raw listing as <dir>/<id>.json")]
        raw_dir: Option<PathBuf>,
    },
    /// Fetch the full record of every listing in a summary file
    Details {
        #[arg(short, long, default_value = "data/raw/propiedades_fincaraiz.csv")]
        input: PathBuf,

        #[arg(short, long, default_value = "data/raw/propiedades_fincaraiz_completas.csv")]
        output: PathBuf,

        #[arg(long, help = "Save each raw listing as <dir>/<id>.json")]
        raw_dir: Option<PathBuf>,
    },
    /// Train and evaluate the linear regression model
    TrainLinear(TrainArgs),
    /// Train and evaluate the feed-forward network
    TrainNn {
        #[command(flatten)]
        common: TrainArgs,

        #[arg(long, default_value_t = 200)]
        epochs: usize,

        #[arg(long, default_value_t = 64)]
        batch_size: usize,
    },
    /// List the cities the crawler knows about
    Cities,
}

#[derive(Args)]
struct TrainArgs {
    #[arg(short, long, default_value = "data/processed/data_arriendos_model.csv")]
    data: PathBuf,

    #[arg(long, default_value_t = 0.2, help = "Fraction of rows held out for evaluation")]
    test_size: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, help = "Write test-split prices and predictions to this CSV")]
    predictions: Option<PathBuf>,
}

impl TrainArgs {
    fn into_config(self) -> TrainConfig {
        TrainConfig {
            data: self.data,
            test_size: self.test_size,
            seed: self.seed,
            predictions: self.predictions,
            ..TrainConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scrape_config = |max_pages: u32,
                         rows: u32,
                         cities: Vec<City>,
                         raw_dir: Option<PathBuf>| ScrapeConfig {
        search_url: cli.endpoint.clone(),
        detail_url: cli
            .detail_endpoint
            .clone()
            .unwrap_or_else(|| cli.endpoint.clone()),
        max_pages,
        rows,
        cities,
        raw_dir,
    };

    match cli.command {
        Commands::Scrape {
            ref output,
            max_pages,
            rows,
            ref cities,
            ref raw_dir,
        } => {
            let config = scrape_config(max_pages, rows, select_cities(cities)?, raw_dir.clone());
            scrape(config, output).await
        }
        Commands::Details {
            ref input,
            ref output,
            ref raw_dir,
        } => {
            let config = scrape_config(MAX_PAGES, DEFAULT_ROWS, CITIES.to_vec(), raw_dir.clone());
            details(config, input, output).await
        }
        Commands::TrainLinear(args) => {
            let config = args.into_config();
            tokio::task::spawn_blocking(move || training::run_linear(&config)).await??;
            Ok(())
        }
        Commands::TrainNn {
            common,
            epochs,
            batch_size,
        } => {
            let mut config = common.into_config();
            config.network.epochs = epochs;
            config.network.batch_size = batch_size;
            config.network.seed = config.seed;
            tokio::task::spawn_blocking(move || training::run_network(&config)).await??;
            Ok(())
        }
        Commands::Cities => {
            for city in CITIES {
                println!(
                    "{:<12} {:>12.6} {:>10.6}  {}",
                    city.name, city.coordinates[0], city.coordinates[1], city.id
                );
            }
            Ok(())
        }
    }
}

/// Resolve `--city` names against the reference table; empty means all
fn select_cities(names: &[String]) -> Result<Vec<City>> {
    if names.is_empty() {
        return Ok(CITIES.to_vec());
    }
    names
        .iter()
        .map(|name| match cities::find(name) {
            Some(city) => Ok(*city),
            None => bail!(
                "Unknown city '{}'. Known cities: {}",
                name,
                CITIES.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
            ),
        })
        .collect()
}

async fn scrape(config: ScrapeConfig, output: &Path) -> Result<()> {
    let started_at = Utc::now();
    info!("🏠 FincaRaíz Scout - search crawl");

    let scraper = FincaRaizScraper::new(config)?;
    let outcome = scraper.scrape_all().await?;

    let raw_errors: usize = outcome.cities.iter().map(|c| c.raw_errors).sum();
    if raw_errors > 0 {
        warn!("{} raw listings could not be saved", raw_errors);
    }

    storage::write_records(output, &outcome.listings, TableFormat::SUMMARY)?;
    info!("💾 Saved {} listings to {:?}", outcome.listings.len(), output);

    let manifest = RunManifest {
        command: "scrape".to_string(),
        started_at,
        finished_at: Utc::now(),
        output: output.to_path_buf(),
        records: outcome.listings.len(),
        cities: outcome.cities,
        skipped: None,
    };
    let manifest_path = manifest.write().await?;
    info!("Run manifest written to {:?}", manifest_path);

    println!("Total listings collected: {}", outcome.listings.len());
    Ok(())
}

async fn details(config: ScrapeConfig, input: &Path, output: &Path) -> Result<()> {
    let started_at = Utc::now();
    info!("🏠 FincaRaíz Scout - detail pass");

    let ids = storage::read_ids(input)?;
    info!("Read {} listing ids from {:?}", ids.len(), input);

    let scraper = FincaRaizScraper::new(config)?;
    let outcome = scraper.fetch_details(&ids).await?;

    if outcome.raw_errors > 0 {
        warn!("{} raw listings could not be saved", outcome.raw_errors);
    }

    storage::write_records(output, &outcome.listings, TableFormat::DETAIL)?;
    info!("💾 Saved {} detailed listings to {:?}", outcome.listings.len(), output);

    let manifest = RunManifest {
        command: "details".to_string(),
        started_at,
        finished_at: Utc::now(),
        output: output.to_path_buf(),
        records: outcome.listings.len(),
        cities: Vec::new(),
        skipped: Some(outcome.skipped),
    };
    manifest.write().await?;

    println!(
        "Detailed listings: {} ({} skipped)",
        outcome.listings.len(),
        outcome.skipped
    );
    Ok(())
}

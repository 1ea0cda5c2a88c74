//! Harvester CLI
//!
//! Runs one crawl cycle when invoked without a subcommand.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::Config,
    pipeline::{self, RunOptions},
    services::ArxivSource,
    storage::{LocalStorage, StateStore},
    utils,
};

/// Incremental arXiv metadata harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Fetch newly published arXiv papers since the last run"
)]
struct Cli {
    /// Project root; relative paths in the config resolve against it
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Path to config file (default: {root}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one crawl cycle (the default)
    Crawl {
        /// Lookback in days, overriding the config file
        #[arg(long)]
        days: Option<u32>,

        /// Write the batch here instead of the dated archive path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show persisted crawl state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(|| cli.root.join("config.toml"));
    let config = Config::load_or_default(&config_path);
    utils::log::init(&config.logging);

    let storage = LocalStorage::new(&cli.root, &config.paths);

    match cli.command.unwrap_or(Command::Crawl {
        days: None,
        output: None,
    }) {
        Command::Crawl { days, output } => {
            let source = ArxivSource::new(&config.arxiv)?;
            let options = RunOptions {
                root: cli.root.clone(),
                config_path,
                days,
                output,
            };

            let summary =
                pipeline::run_crawler(&config, &storage, &source, &options, Utc::now()).await?;

            match &summary.output {
                Some(path) => log::info!(
                    "Crawl complete: {} new papers in {}",
                    summary.new_records,
                    path.display()
                ),
                None => log::info!("Crawl complete: no new papers"),
            }
        }

        Command::Validate => {
            log::info!("Validating {}...", config_path.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} categories, days_window={})",
                config.crawler.categories.len(),
                harvester::config::resolve_days_window(
                    &config_path,
                    config.crawler.default_days_window
                )
            );
        }

        Command::Info => {
            log::info!("Root directory: {}", cli.root.display());
            log::info!("Archive: {}", config.paths.archive_path(&cli.root).display());

            match storage.load_last_run_at().await {
                Some(at) => log::info!("Last crawl: {}", at.to_rfc3339()),
                None => log::info!("No crawl recorded yet."),
            }

            let seen = storage.load_seen().await;
            log::info!("Seen ids: {}", seen.ids.len());
            if let Some(at) = seen.latest_published_at {
                log::info!("Latest published: {}", at.to_rfc3339());
            }
        }
    }

    Ok(())
}

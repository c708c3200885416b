//! Best-post crawler CLI
//!
//! One invocation runs one ingestion pass; scheduling is left to cron or a
//! systemd timer.

use std::path::PathBuf;
use std::sync::Arc;

use best_crawler::{
    error::Result,
    models::{Config, ListingKind, Site},
    pipeline::IngestionController,
    sites::{SiteAdapter, adapter_for},
    storage::{DocumentStore, JsonFileStore, MemoryStore},
};
use clap::{Parser, Subcommand};

/// Community best-post crawler
#[derive(Parser, Debug)]
#[command(
    name = "best-crawler",
    version,
    about = "Collects best posts from community sites"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest real-time best posts
    Realtime(RunArgs),

    /// Ingest daily best posts from sites that publish them
    Daily(RunArgs),

    /// Validate the configuration file
    Validate,

    /// List site adapters and their listings
    Sites,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Only run these sites (repeatable); defaults to the configured ones
    #[arg(long = "site")]
    sites: Vec<Site>,

    /// Keep records in memory instead of the data directory
    #[arg(long)]
    dry_run: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn run(mut config: Config, args: RunArgs, kind: ListingKind) -> Result<()> {
    if !args.sites.is_empty() {
        config.sites.enabled = args.sites;
    }
    config.validate()?;

    let store: Arc<dyn DocumentStore> = if args.dry_run {
        log::info!("Dry run: records stay in memory");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(JsonFileStore::new(&config.storage.data_dir))
    };

    let controller = IngestionController::from_config(&config, store)?;
    log::info!(
        "Sites: {}",
        controller
            .sites()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let statuses = match kind {
        ListingKind::RealTime => controller.get_real_time_best().await,
        ListingKind::Daily => controller.get_daily_best().await,
    };

    let failed: Vec<&str> = statuses
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(site, _)| site.as_str())
        .collect();
    if !failed.is_empty() {
        log::warn!("Adapters without a usable listing: {}", failed.join(", "));
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("best-crawler starting...");
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Realtime(args) => run(config, args, ListingKind::RealTime).await?,

        Command::Daily(args) => run(config, args, ListingKind::Daily).await?,

        Command::Validate => {
            log::info!("Validating configuration {}...", cli.config.display());
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Sites => {
            let client = reqwest::Client::new();
            for site in Site::ALL {
                let adapter = adapter_for(site, client.clone());
                let kinds: Vec<String> = adapter.kinds().iter().map(|k| k.to_string()).collect();
                let enabled = if config.sites.enabled.contains(&site) {
                    "enabled"
                } else {
                    "disabled"
                };
                log::info!("{:<10} {:<9} {}", site.as_str(), enabled, kinds.join(", "));
            }
        }
    }

    log::info!("Done!");

    Ok(())
}

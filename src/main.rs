//! yt-frontier main entry point
//!
//! This is the command-line interface for the yt-frontier link graph crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use yt_frontier::config::{load_config_with_hash, validate, Config};
use yt_frontier::crawler::crawl;
use yt_frontier::output::{load_statistics, log_crawl_summary, print_crawl_summary, print_statistics};
use yt_frontier::storage::{open_frontier, FrontierStore};

/// Identifiers shown by `--stats`
const STATS_SAMPLE_SIZE: usize = 10;

/// yt-frontier: a self-feeding YouTube link graph crawler
///
/// Every stored video identifier is a potential seed: workers sample the
/// frontier, visit the watch pages, and merge every linked identifier back in.
/// The crawl runs until interrupted.
#[derive(Parser, Debug)]
#[command(name = "yt-frontier")]
#[command(version = "1.0.0")]
#[command(about = "A self-feeding YouTube link graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed identifier or video URL merged into the frontier at startup (repeatable)
    #[arg(long = "seed", value_name = "ID")]
    seeds: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the frontier database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(cli.config.as_deref())?;
    add_cli_seeds(&mut config, &cli.seeds)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the verbosity flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("yt_frontier=info,warn"),
                1 => EnvFilter::new("yt_frontier=debug,info"),
                2 => EnvFilter::new("yt_frontier=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads configuration from the optional file plus environment overrides
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let (config, hash) = load_config_with_hash(path).context("Failed to load configuration")?;
    match hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::debug!("Configuration built from defaults and environment"),
    }
    Ok(config)
}

/// Decodes `--seed` values and appends them to the configured seeds
fn add_cli_seeds(config: &mut Config, raw_seeds: &[String]) -> anyhow::Result<()> {
    for raw in raw_seeds {
        let id = yt_frontier::decode(raw)
            .with_context(|| format!("Invalid --seed value '{}'", raw))?;
        config.seeds.push(id.to_string());
    }
    validate(config)?;
    Ok(())
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== yt-frontier Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Concurrent fetches: {}", config.crawler.fetch_concurrency);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Backoff interval: {:?}", config.crawler.backoff_interval());
    println!("  Offline backoff: {:?}", config.crawler.offline_backoff());
    println!("  Fetch timeout: {:?}", config.crawler.fetch_timeout());
    println!("  Shutdown grace: {:?}", config.crawler.shutdown_grace());

    println!("\nFrontier Store:");
    println!("  Database: {}", config.store.database_path);
    println!(
        "  Startup retries: {} x {:?}",
        config.store.retry_cap,
        config.store.retry_delay()
    );

    println!("\nFetcher:");
    println!("  Base URL: {}", config.fetcher.base_url);
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nConnectivity probe:");
    println!(
        "  {} (timeout {:?})",
        config.connectivity.probe_address,
        config.connectivity.timeout()
    );

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the frontier database
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.store.database_path);

    let store = open_frontier(Path::new(&config.store.database_path));
    store
        .ensure_ready()
        .await
        .context("Failed to open frontier database")?;

    let stats = load_statistics(&store, STATS_SAMPLE_SIZE).await?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl with {} workers and {} concurrent fetches",
        config.crawler.worker_count,
        config.crawler.fetch_concurrency
    );
    if !config.seeds.is_empty() {
        tracing::info!("Seed identifiers: {}", config.seeds.len());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    match crawl(config, shutdown).await {
        Ok(summary) => {
            log_crawl_summary(&summary);
            print_crawl_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Cancels `shutdown` on Ctrl-C, or SIGTERM on unix
async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}

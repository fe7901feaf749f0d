//! Crawler module for the self-feeding identifier crawl
//!
//! This module contains the core crawling logic, including:
//! - Fetching watch pages and harvesting their video links
//! - The shared fetch budget and the connectivity gate
//! - The per-worker iteration loop
//! - Supervising the worker pool through startup and shutdown

mod budget;
mod connectivity;
mod fetcher;
mod parser;
mod supervisor;
mod worker;

pub use budget::{FetchBudget, FetchPermit};
pub use connectivity::{ConnectivityGate, TcpProbe};
pub use fetcher::{build_http_client, FetchError, HttpPageFetcher, PageFetcher};
pub use parser::{extract_video_links, is_video_link};
pub use supervisor::{CrawlSummary, Supervisor};
pub use worker::{CrawlWorker, IterationReport, WorkerContext, WorkerState, WorkerStats};

use crate::config::Config;
use crate::CrawlError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the SQLite frontier, HTTP fetcher and TCP probe from `config`
/// 2. Wait for the frontier store and merge configured seeds
/// 3. Run the worker pool until `shutdown` is cancelled
/// 4. Drain the pool and release the fetcher
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `shutdown` - Cancelled by the caller to stop the crawl
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl stopped cleanly
/// * `Err(CrawlError)` - Crawl could not start, or the store never became ready
pub async fn crawl(config: Config, shutdown: CancellationToken) -> Result<CrawlSummary, CrawlError> {
    let supervisor = Supervisor::from_config(&config)?;
    supervisor.run(shutdown).await
}

//! Statistics generation from the frontier store
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics and the counters of a finished crawl.

use crate::crawler::CrawlSummary;
use crate::identifier::VideoId;
use crate::storage::{FrontierStore, StoreResult};

/// Frontier statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierStatistics {
    /// Number of distinct identifiers in the frontier
    pub total_identifiers: u64,

    /// A random sample of stored identifiers
    pub sample: Vec<VideoId>,
}

/// Loads statistics from the frontier
///
/// # Arguments
///
/// * `store` - The frontier to query; must already be ready
/// * `sample_size` - How many random identifiers to include
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(StoreError)` - Failed to query the store
pub async fn load_statistics(
    store: &dyn FrontierStore,
    sample_size: usize,
) -> StoreResult<FrontierStatistics> {
    let total_identifiers = store.count().await?;
    let sample = if sample_size > 0 {
        store.sample(sample_size).await?
    } else {
        Vec::new()
    };

    Ok(FrontierStatistics {
        total_identifiers,
        sample,
    })
}

/// Prints frontier statistics to stdout
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");
    println!("  Identifiers stored: {}", stats.total_identifiers);

    if !stats.sample.is_empty() {
        println!("\nRandom sample ({}):", stats.sample.len());
        for id in &stats.sample {
            println!("  - {}  {}", id, id.watch_url());
        }
    }
}

/// Prints the counters of a finished crawl to stdout
pub fn print_crawl_summary(summary: &CrawlSummary) {
    let totals = &summary.totals;

    println!("=== Crawl Summary ===\n");
    println!(
        "Workers: {} joined, {} failed",
        summary.workers_joined, summary.workers_failed
    );
    println!("Iterations: {}", totals.iterations);
    println!(
        "Fetches: {} ok, {} failed ({:.1}% success)",
        totals.fetches_ok,
        totals.fetches_failed,
        success_rate(totals.fetches_ok, totals.fetches_failed)
    );
    println!("Identifiers merged: {}", totals.ids_merged);
    println!(
        "Backoffs: {} idle, {} offline, {} after errors",
        totals.idle_backoffs, totals.offline_backoffs, totals.iteration_errors
    );
    match summary.frontier_total {
        Some(total) => println!("Frontier size: {}", total),
        None => println!("Frontier size: unknown"),
    }
}

/// Logs the counters of a finished crawl as one structured event
pub fn log_crawl_summary(summary: &CrawlSummary) {
    let totals = &summary.totals;
    tracing::info!(
        workers_joined = summary.workers_joined,
        workers_failed = summary.workers_failed,
        iterations = totals.iterations,
        fetches_ok = totals.fetches_ok,
        fetches_failed = totals.fetches_failed,
        ids_merged = totals.ids_merged,
        frontier_total = ?summary.frontier_total,
        "Crawl finished"
    );
}

fn success_rate(ok: u64, failed: u64) -> f64 {
    let attempted = ok + failed;
    if attempted == 0 {
        0.0
    } else {
        (ok as f64 / attempted as f64) * 100.0
    }
}

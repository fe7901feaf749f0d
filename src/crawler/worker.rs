//! Crawl worker - the unit of crawl concurrency
//!
//! Each worker repeatedly:
//! 1. Checks the connectivity gate
//! 2. Samples a batch of seeds from the frontier
//! 3. Fetches every seed's page concurrently, one budget slot per fetch
//! 4. Decodes and deduplicates the harvested hrefs
//! 5. Merges the new identifiers back into the frontier
//!
//! A worker only stops when its cancellation token fires. Errors are contained
//! per seed (fetch failures) or per iteration (store failures) and followed by
//! a fixed backoff.

use crate::config::CrawlerConfig;
use crate::crawler::budget::FetchBudget;
use crate::crawler::connectivity::ConnectivityGate;
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::identifier::{decode, VideoId};
use crate::storage::FrontierStore;
use crate::CrawlError;
use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Where a worker is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting for the supervisor to report the store ready (once per worker)
    WaitingForStore,

    /// Connectivity gate is closed; backing off without taking work
    Offline,

    /// Drawing a seed batch from the frontier
    Sampling,

    /// Frontier was empty; backing off before sampling again
    Idle,

    /// Fetching the batch's pages
    Fetching,

    /// Writing discovered identifiers to the frontier
    Merging,

    /// Terminal
    Cancelled,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForStore => "waiting-for-store",
            Self::Offline => "offline",
            Self::Sampling => "sampling",
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Counters for one completed iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub seeds: usize,
    pub fetches_ok: usize,
    pub fetches_failed: usize,
    pub hrefs_seen: usize,
    pub hrefs_rejected: usize,
    /// Distinct identifiers decoded across the whole batch
    pub unique_ids: usize,
    /// Identifiers the frontier did not already hold
    pub newly_merged: usize,
    pub frontier_total: u64,
}

/// Counters accumulated over a worker's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub iterations: u64,
    pub idle_backoffs: u64,
    pub offline_backoffs: u64,
    pub iteration_errors: u64,
    pub fetches_ok: u64,
    pub fetches_failed: u64,
    pub ids_merged: u64,
}

impl WorkerStats {
    fn record(&mut self, report: &IterationReport) {
        self.iterations += 1;
        self.fetches_ok += report.fetches_ok as u64;
        self.fetches_failed += report.fetches_failed as u64;
        self.ids_merged += report.newly_merged as u64;
    }

    /// Adds another worker's counters to these
    pub fn absorb(&mut self, other: &WorkerStats) {
        self.iterations += other.iterations;
        self.idle_backoffs += other.idle_backoffs;
        self.offline_backoffs += other.offline_backoffs;
        self.iteration_errors += other.iteration_errors;
        self.fetches_ok += other.fetches_ok;
        self.fetches_failed += other.fetches_failed;
        self.ids_merged += other.ids_merged;
    }
}

/// Result of one pass through the loop
#[derive(Debug)]
enum IterationOutcome {
    Offline,
    EmptyFrontier,
    Completed(IterationReport),
}

/// Pause following a completed iteration
///
/// A batch that yielded no identifier at all (every fetch failed, or every
/// page was empty) is treated like an idle pass. Productive batches are
/// followed immediately by the next sample.
fn pause_after(settings: &CrawlerConfig, report: &IterationReport) -> Option<Duration> {
    if report.fetches_ok == 0 || report.unique_ids == 0 {
        Some(settings.backoff_interval())
    } else {
        None
    }
}

/// Collaborators shared by every worker in a pool
#[derive(Clone)]
pub struct WorkerContext {
    pub settings: Arc<CrawlerConfig>,
    pub store: Arc<dyn FrontierStore>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub gate: Arc<dyn ConnectivityGate>,
    pub budget: Arc<FetchBudget>,
}

/// A single crawl worker
pub struct CrawlWorker {
    id: usize,
    ctx: WorkerContext,
    ready: watch::Receiver<bool>,
    cancel: CancellationToken,
    state: WorkerState,
    stats: WorkerStats,
}

impl CrawlWorker {
    /// Creates a worker
    ///
    /// # Arguments
    ///
    /// * `id` - Index used in log lines
    /// * `ctx` - Shared store, fetcher, gate and budget
    /// * `ready` - Flips to `true` once the frontier store is initialized
    /// * `cancel` - Stops the worker at its next suspension point
    pub fn new(
        id: usize,
        ctx: WorkerContext,
        ready: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            ctx,
            ready,
            cancel,
            state: WorkerState::WaitingForStore,
            stats: WorkerStats::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs the worker until cancelled and returns its counters
    pub async fn run(mut self) -> WorkerStats {
        let cancel = self.cancel.clone();

        if !self.wait_for_store(&cancel).await {
            return self.finish();
        }
        tracing::info!("Worker {} running", self.id);

        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.run_iteration() => outcome,
            };

            let pause = match outcome {
                Ok(IterationOutcome::Completed(report)) => {
                    self.stats.record(&report);
                    tracing::info!(
                        "Worker {}: {} seeds ({} failed), {} new of {} found, frontier holds {} identifiers",
                        self.id,
                        report.seeds,
                        report.fetches_failed,
                        report.newly_merged,
                        report.unique_ids,
                        report.frontier_total
                    );
                    pause_after(&self.ctx.settings, &report)
                }
                Ok(IterationOutcome::EmptyFrontier) => {
                    self.stats.idle_backoffs += 1;
                    tracing::info!("Worker {}: frontier is empty, waiting", self.id);
                    Some(self.ctx.settings.backoff_interval())
                }
                Ok(IterationOutcome::Offline) => {
                    self.stats.offline_backoffs += 1;
                    tracing::warn!("Worker {}: no connectivity, waiting to retry", self.id);
                    Some(self.ctx.settings.offline_backoff())
                }
                Err(e) => {
                    self.stats.iteration_errors += 1;
                    tracing::error!("Worker {}: iteration failed: {}", self.id, e);
                    Some(self.ctx.settings.backoff_interval())
                }
            };

            if let Some(pause) = pause {
                if !self.pause(&cancel, pause).await {
                    break;
                }
            }
        }

        self.finish()
    }

    /// One-time wait for the readiness signal
    ///
    /// Returns false if the worker was cancelled, or the supervisor went away,
    /// before the store became ready.
    async fn wait_for_store(&mut self, cancel: &CancellationToken) -> bool {
        self.transition(WorkerState::WaitingForStore);
        let mut ready = self.ready.clone();

        tokio::select! {
            _ = cancel.cancelled() => false,
            result = ready.wait_for(|ready| *ready) => result.is_ok(),
        }
    }

    /// Sleeps for `duration`; returns false if cancelled first
    async fn pause(&self, cancel: &CancellationToken, duration: Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    async fn run_iteration(&mut self) -> Result<IterationOutcome, CrawlError> {
        if !self.ctx.gate.is_reachable().await {
            self.transition(WorkerState::Offline);
            return Ok(IterationOutcome::Offline);
        }

        self.transition(WorkerState::Sampling);
        let seeds = self.ctx.store.sample(self.ctx.settings.batch_size).await?;
        if seeds.is_empty() {
            self.transition(WorkerState::Idle);
            return Ok(IterationOutcome::EmptyFrontier);
        }

        self.transition(WorkerState::Fetching);
        let results = join_all(seeds.iter().map(|seed| self.fetch_seed(seed))).await;

        let mut report = IterationReport {
            seeds: seeds.len(),
            ..IterationReport::default()
        };
        let discovered = self.collect_identifiers(results, &mut report);

        self.transition(WorkerState::Merging);
        if !discovered.is_empty() {
            report.newly_merged = self.ctx.store.merge(&discovered).await?;
        }
        report.frontier_total = self.ctx.store.count().await?;

        Ok(IterationOutcome::Completed(report))
    }

    /// Fetches one seed while holding a budget slot
    ///
    /// The slot is held only for the duration of this future and is returned
    /// when it completes or is dropped.
    async fn fetch_seed(&self, seed: &VideoId) -> Result<Vec<String>, FetchError> {
        let _permit = self.ctx.budget.acquire().await.ok_or_else(|| FetchError::Other {
            id: seed.clone(),
            message: "fetch budget closed".to_string(),
        })?;

        let timeout = self.ctx.settings.fetch_timeout();
        match tokio::time::timeout(timeout, self.ctx.fetcher.fetch_video_links(seed)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                id: seed.clone(),
                after: timeout,
            }),
        }
    }

    /// Flattens per-seed results, decodes every href and deduplicates
    fn collect_identifiers(
        &self,
        results: Vec<Result<Vec<String>, FetchError>>,
        report: &mut IterationReport,
    ) -> HashSet<VideoId> {
        let mut discovered = HashSet::new();

        for result in results {
            match result {
                Ok(hrefs) => {
                    report.fetches_ok += 1;
                    for href in hrefs {
                        report.hrefs_seen += 1;
                        match decode(&href) {
                            Ok(id) => {
                                discovered.insert(id);
                            }
                            Err(_) => report.hrefs_rejected += 1,
                        }
                    }
                }
                Err(e) => {
                    report.fetches_failed += 1;
                    tracing::warn!("Worker {}: {}", self.id, e);
                }
            }
        }

        report.unique_ids = discovered.len();
        if report.hrefs_rejected > 0 {
            tracing::debug!(
                "Worker {}: dropped {} of {} hrefs that were not video links",
                self.id,
                report.hrefs_rejected,
                report.hrefs_seen
            );
        }

        discovered
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            tracing::trace!("Worker {}: {} -> {}", self.id, self.state, next);
            self.state = next;
        }
    }

    fn finish(mut self) -> WorkerStats {
        self.transition(WorkerState::Cancelled);
        tracing::info!("Worker {} stopped", self.id);
        self.stats
    }
}

//! Crawl supervisor - worker pool lifecycle
//!
//! This module owns everything around the workers:
//! - Spawning the pool with its shared store, fetcher, gate and budget
//! - Waiting for the frontier store with capped retries (the only fatal path)
//! - Seeding the frontier from configuration
//! - Broadcasting cancellation on shutdown and draining the pool
//! - Releasing fetcher resources once no worker can use them

use crate::config::{Config, CrawlerConfig, StoreConfig};
use crate::crawler::budget::FetchBudget;
use crate::crawler::connectivity::{ConnectivityGate, TcpProbe};
use crate::crawler::fetcher::{HttpPageFetcher, PageFetcher};
use crate::crawler::worker::{CrawlWorker, WorkerContext, WorkerStats};
use crate::identifier::VideoId;
use crate::storage::{FrontierStore, SqliteFrontier};
use crate::{ConfigError, CrawlError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Upper bound for the final frontier count taken after shutdown
const FINAL_COUNT_TIMEOUT: Duration = Duration::from_secs(5);

/// What a finished crawl run reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Workers that returned their counters
    pub workers_joined: usize,

    /// Workers that panicked or had to be aborted after the grace period
    pub workers_failed: usize,

    /// Counters summed over every joined worker
    pub totals: WorkerStats,

    /// Frontier size after the pool stopped, if the store answered
    pub frontier_total: Option<u64>,
}

impl CrawlSummary {
    fn record_worker(&mut self, stats: &WorkerStats) {
        self.workers_joined += 1;
        self.totals.absorb(stats);
    }
}

/// Owns the worker pool for one crawl run
pub struct Supervisor {
    settings: Arc<CrawlerConfig>,
    store_settings: StoreConfig,
    seeds: Vec<VideoId>,
    store: Arc<dyn FrontierStore>,
    fetcher: Arc<dyn PageFetcher>,
    gate: Arc<dyn ConnectivityGate>,
    budget: Arc<FetchBudget>,
}

impl Supervisor {
    /// Creates a supervisor around injected collaborators
    ///
    /// # Arguments
    ///
    /// * `settings` - Worker count, budget, batch size, backoffs and timeouts
    /// * `store_settings` - Startup retry cap and delay
    /// * `store` - The frontier, shared by every worker
    /// * `fetcher` - Page fetcher, shared by every worker
    /// * `gate` - Connectivity gate, shared by every worker
    pub fn new(
        settings: CrawlerConfig,
        store_settings: StoreConfig,
        store: Arc<dyn FrontierStore>,
        fetcher: Arc<dyn PageFetcher>,
        gate: Arc<dyn ConnectivityGate>,
    ) -> Self {
        let budget = Arc::new(FetchBudget::new(settings.fetch_concurrency));
        Self {
            settings: Arc::new(settings),
            store_settings,
            seeds: Vec::new(),
            store,
            fetcher,
            gate,
            budget,
        }
    }

    /// Builds the production pool: SQLite frontier, HTTP fetcher, TCP probe
    ///
    /// # Errors
    ///
    /// Returns an error if a configured seed is not a valid identifier or the
    /// HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let store = SqliteFrontier::new(Path::new(&config.store.database_path));
        let fetcher = HttpPageFetcher::new(&config.fetcher, config.crawler.fetch_timeout())?;
        let gate = TcpProbe::from_config(&config.connectivity);

        let seeds = config
            .seeds
            .iter()
            .map(|raw| {
                raw.parse::<VideoId>()
                    .map_err(|_| ConfigError::InvalidSeed(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            config.crawler.clone(),
            config.store.clone(),
            Arc::new(store),
            Arc::new(fetcher),
            Arc::new(gate),
        )
        .with_seeds(seeds))
    }

    /// Identifiers merged into the frontier once the store is ready
    pub fn with_seeds(mut self, seeds: Vec<VideoId>) -> Self {
        self.seeds = seeds;
        self
    }

    /// The budget shared by this supervisor's workers
    pub fn fetch_budget(&self) -> Arc<FetchBudget> {
        Arc::clone(&self.budget)
    }

    /// Runs the crawl until `shutdown` is cancelled
    ///
    /// 1. Spawns `worker_count` workers, all parked on the readiness signal
    /// 2. Waits for the store (up to `retry_cap` attempts, `retry_delay` apart)
    /// 3. Merges configured seeds and releases the workers
    /// 4. Waits for shutdown, then cancels and drains the pool, closing the budget
    /// 5. Closes the fetcher
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The pool stopped; no worker is left running
    /// * `Err(CrawlError::StoreUnavailable)` - The store never became ready
    pub async fn run(&self, shutdown: CancellationToken) -> Result<CrawlSummary, CrawlError> {
        let workers_cancel = shutdown.child_token();
        let (ready_tx, ready_rx) = watch::channel(false);

        let ctx = WorkerContext {
            settings: Arc::clone(&self.settings),
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            gate: Arc::clone(&self.gate),
            budget: Arc::clone(&self.budget),
        };

        let mut workers = JoinSet::new();
        for id in 0..self.settings.worker_count {
            let worker = CrawlWorker::new(id, ctx.clone(), ready_rx.clone(), workers_cancel.clone());
            workers.spawn(worker.run());
        }
        drop(ready_rx);
        tracing::info!(
            "Spawned {} workers sharing a budget of {} concurrent fetches",
            self.settings.worker_count,
            self.budget.capacity()
        );

        let mut summary = CrawlSummary::default();

        match self.wait_for_store(&shutdown).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Shutdown requested before the frontier store was ready");
                self.drain(workers, &workers_cancel, &mut summary).await;
                self.fetcher.close().await;
                return Ok(summary);
            }
            Err(e) => {
                tracing::error!("{}", e);
                drop(ready_tx);
                self.drain(workers, &workers_cancel, &mut summary).await;
                self.fetcher.close().await;
                return Err(e);
            }
        }

        self.merge_seeds().await;

        // Receivers are held by the workers; a send error only means none are left
        let _ = ready_tx.send(true);
        tracing::info!("Frontier store ready, workers released");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(joined) = workers.join_next() => match joined {
                    Ok(stats) => {
                        tracing::error!("A worker stopped before shutdown was requested");
                        summary.record_worker(&stats);
                    }
                    Err(e) => {
                        tracing::error!("A worker failed: {}", e);
                        summary.workers_failed += 1;
                    }
                },
            }
        }

        tracing::info!("Shutdown requested, stopping {} workers", workers.len());
        self.drain(workers, &workers_cancel, &mut summary).await;
        self.fetcher.close().await;

        summary.frontier_total = match tokio::time::timeout(FINAL_COUNT_TIMEOUT, self.store.count()).await {
            Ok(Ok(total)) => Some(total),
            Ok(Err(e)) => {
                tracing::warn!("Could not read final frontier size: {}", e);
                None
            }
            Err(_) => None,
        };

        Ok(summary)
    }

    /// Retries `ensure_ready` up to the configured cap
    ///
    /// Returns `Ok(false)` if shutdown was requested first.
    async fn wait_for_store(&self, shutdown: &CancellationToken) -> Result<bool, CrawlError> {
        let attempts = self.store_settings.retry_cap.max(1);
        let delay = self.store_settings.retry_delay();
        tracing::info!("Waiting for the frontier store");

        for attempt in 1..=attempts {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return Ok(false),
                result = self.store.ensure_ready() => result,
            };

            match result {
                Ok(()) => {
                    tracing::info!("Frontier store ready after {} attempt(s)", attempt);
                    return Ok(true);
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Attempt {}/{}: frontier store not ready ({}), retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                }
                Err(e) => {
                    tracing::warn!("Attempt {}/{}: frontier store not ready ({})", attempt, attempts, e);
                    break;
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(false),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(CrawlError::StoreUnavailable { attempts })
    }

    /// Merges configured seeds; failures are logged, never fatal
    async fn merge_seeds(&self) {
        if self.seeds.is_empty() {
            return;
        }

        let seeds: HashSet<VideoId> = self.seeds.iter().cloned().collect();
        match self.store.merge(&seeds).await {
            Ok(added) => tracing::info!(
                "Seeded frontier with {} identifiers ({} new)",
                seeds.len(),
                added
            ),
            Err(e) => tracing::warn!("Failed to seed frontier: {}", e),
        }
    }

    /// Cancels every worker, closes the fetch budget and waits for the pool
    ///
    /// Workers still running after the grace period are aborted, so the pool
    /// is empty when this returns either way. The budget stays closed: a
    /// supervisor runs its pool once.
    async fn drain(
        &self,
        mut workers: JoinSet<WorkerStats>,
        cancel: &CancellationToken,
        summary: &mut CrawlSummary,
    ) {
        cancel.cancel();
        // A worker racing past cancellation gets no new fetch slot
        self.budget.close();

        let grace = self.settings.shutdown_grace();
        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);

        let timed_out = loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    None => break false,
                    Some(Ok(stats)) => summary.record_worker(&stats),
                    Some(Err(e)) => {
                        tracing::warn!("Worker did not stop cleanly: {}", e);
                        summary.workers_failed += 1;
                    }
                },
                _ = &mut deadline => break true,
            }
        };

        if timed_out {
            tracing::warn!(
                "{} workers still running after {:?}, aborting them",
                workers.len(),
                grace
            );
            workers.abort_all();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(stats) => summary.record_worker(&stats),
                    Err(_) => summary.workers_failed += 1,
                }
            }
        }

        tracing::info!(
            "Worker pool stopped: {} joined, {} failed, {} fetch slots free of {}",
            summary.workers_joined,
            summary.workers_failed,
            self.budget.available(),
            self.budget.capacity()
        );
    }
}

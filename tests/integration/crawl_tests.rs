//! Integration tests for the crawl supervisor
//!
//! These tests drive the full worker pool against an in-memory frontier,
//! scripted page fetchers and a switchable connectivity gate.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use yt_frontier::config::{CrawlerConfig, StoreConfig};
use yt_frontier::crawler::{ConnectivityGate, CrawlSummary, FetchError, PageFetcher, Supervisor};
use yt_frontier::storage::{FrontierStore, MemoryFrontier, StoreError, StoreResult};
use yt_frontier::{CrawlError, VideoId};

/// Builds a valid identifier from a number, e.g. `vid00000042`
fn vid(n: usize) -> VideoId {
    format!("vid{:08}", n).parse().expect("generated id is valid")
}

fn watch_href(id: &VideoId) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Fast settings for tests
fn test_settings(worker_count: usize, fetch_concurrency: usize, batch_size: usize) -> CrawlerConfig {
    CrawlerConfig {
        worker_count,
        fetch_concurrency,
        batch_size,
        backoff_interval_ms: 20,
        offline_backoff_ms: 20,
        fetch_timeout_secs: 5,
        shutdown_grace_secs: 1,
    }
}

fn test_store_settings(retry_cap: u32) -> StoreConfig {
    StoreConfig {
        database_path: ":memory:".to_string(),
        retry_cap,
        retry_delay_ms: 10,
    }
}

/// Gate whose answer can be flipped while the crawl runs
struct SwitchGate {
    online: AtomicBool,
}

impl SwitchGate {
    fn new(online: bool) -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(online),
        })
    }
}

#[async_trait]
impl ConnectivityGate for SwitchGate {
    async fn is_reachable(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter however the fetch ends
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetcher serving a fixed link graph
#[derive(Default)]
struct GraphFetcher {
    links: HashMap<VideoId, Vec<String>>,
    failing: HashSet<VideoId>,
    hanging: HashSet<VideoId>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl GraphFetcher {
    fn with_links(links: HashMap<VideoId, Vec<String>>) -> Self {
        Self {
            links,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for GraphFetcher {
    async fn fetch_video_links(&self, id: &VideoId) -> Result<Vec<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.high_water.fetch_max(now, Ordering::SeqCst);

        if self.hanging.contains(id) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(id) {
            return Err(FetchError::Other {
                id: id.clone(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(self.links.get(id).cloned().unwrap_or_default())
    }
}

/// Store wrapper that counts calls and fails a set number of times per operation
struct CountingStore {
    inner: MemoryFrontier,
    ready_failures: AtomicUsize,
    sample_failures: AtomicUsize,
    merge_failures: AtomicUsize,
    ready_calls: AtomicUsize,
    sample_calls: AtomicUsize,
}

impl CountingStore {
    fn new(inner: MemoryFrontier, ready_failures: usize) -> Arc<Self> {
        Self::with_faults(inner, ready_failures, 0, 0)
    }

    fn with_faults(
        inner: MemoryFrontier,
        ready_failures: usize,
        sample_failures: usize,
        merge_failures: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner,
            ready_failures: AtomicUsize::new(ready_failures),
            sample_failures: AtomicUsize::new(sample_failures),
            merge_failures: AtomicUsize::new(merge_failures),
            ready_calls: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
        })
    }
}

/// Consumes one scheduled failure, if any are left
fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl FrontierStore for CountingStore {
    async fn ensure_ready(&self) -> StoreResult<()> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.ready_failures) {
            return Err(StoreError::Unavailable("database is starting".to_string()));
        }
        self.inner.ensure_ready().await
    }

    async fn sample(&self, n: usize) -> StoreResult<Vec<VideoId>> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.sample_failures) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.sample(n).await
    }

    async fn merge(&self, ids: &HashSet<VideoId>) -> StoreResult<usize> {
        if take_failure(&self.merge_failures) {
            return Err(StoreError::Database("disk I/O error".to_string()));
        }
        self.inner.merge(ids).await
    }

    async fn count(&self) -> StoreResult<u64> {
        self.inner.count().await
    }
}

/// Runs `supervisor` in the background; returns its shutdown token and handle
fn start(
    supervisor: Arc<Supervisor>,
) -> (
    CancellationToken,
    tokio::task::JoinHandle<Result<CrawlSummary, CrawlError>>,
) {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { supervisor.run(token).await });
    (shutdown, handle)
}

/// Polls `condition` until it holds or `limit` passes
async fn wait_until<F: Fn() -> bool>(condition: F, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn stop(
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<CrawlSummary, CrawlError>>,
) -> CrawlSummary {
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor stops within the timeout")
        .expect("supervisor task does not panic")
        .expect("crawl ends cleanly")
}

#[tokio::test]
async fn test_fetch_concurrency_never_exceeds_budget() {
    let store = Arc::new(MemoryFrontier::with_ids((0..40).map(vid)));
    let fetcher = Arc::new(GraphFetcher {
        delay: Duration::from_millis(20),
        ..GraphFetcher::default()
    });

    let supervisor = Arc::new(Supervisor::new(
        test_settings(4, 3, 5),
        test_store_settings(3),
        store,
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let budget = supervisor.fetch_budget();
    let (shutdown, handle) = start(Arc::clone(&supervisor));

    assert!(wait_until(|| fetcher.calls() >= 30, Duration::from_secs(5)).await);
    let summary = stop(shutdown, handle).await;

    assert_eq!(fetcher.high_water.load(Ordering::SeqCst), 3);
    assert_eq!(budget.available(), budget.capacity());
    assert_eq!(summary.workers_joined, 4);
    assert_eq!(summary.workers_failed, 0);
}

#[tokio::test]
async fn test_failed_fetch_does_not_lose_sibling_results() {
    let seeds: Vec<VideoId> = (0..5).map(vid).collect();
    let mut links = HashMap::new();
    for (i, seed) in seeds.iter().enumerate().take(4) {
        links.insert(seed.clone(), vec![watch_href(&vid(100 + i))]);
    }
    let fetcher = Arc::new(GraphFetcher {
        failing: [seeds[4].clone()].into_iter().collect(),
        ..GraphFetcher::with_links(links)
    });
    let store = Arc::new(MemoryFrontier::with_ids(seeds.clone()));

    let supervisor = Arc::new(Supervisor::new(
        test_settings(1, 5, 5),
        test_store_settings(3),
        store.clone(),
        fetcher,
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    let expected: Vec<VideoId> = (100..104).map(vid).collect();
    let found = wait_until(
        || {
            let snapshot = store.snapshot();
            expected.iter().all(|id| snapshot.contains(id))
        },
        Duration::from_secs(5),
    )
    .await;
    let summary = stop(shutdown, handle).await;

    assert!(found, "identifiers from successful fetches were merged");
    assert!(summary.totals.fetches_failed >= 1);
    assert!(summary.totals.fetches_ok >= 4);
    assert_eq!(summary.totals.iteration_errors, 0);
}

#[tokio::test]
async fn test_shutdown_interrupts_hung_fetches() {
    let store = Arc::new(MemoryFrontier::with_ids((0..10).map(vid)));
    let fetcher = Arc::new(GraphFetcher {
        delay: Duration::from_secs(3600),
        ..GraphFetcher::default()
    });

    let supervisor = Arc::new(Supervisor::new(
        test_settings(2, 4, 5),
        test_store_settings(3),
        store,
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let budget = supervisor.fetch_budget();
    let (shutdown, handle) = start(Arc::clone(&supervisor));

    assert!(wait_until(|| budget.in_flight() == 4, Duration::from_secs(5)).await);

    let started = Instant::now();
    let summary = stop(shutdown, handle).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.workers_joined, 2);
    assert_eq!(budget.available(), budget.capacity());
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);

    // The drained pool hands out no further fetch slots
    assert!(budget.acquire().await.is_none());
}

#[tokio::test]
async fn test_empty_frontier_backs_off_without_errors() {
    let store = Arc::new(MemoryFrontier::new());
    let fetcher = Arc::new(GraphFetcher::default());

    let supervisor = Arc::new(Supervisor::new(
        test_settings(2, 2, 5),
        test_store_settings(3),
        store,
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let summary = stop(shutdown, handle).await;

    assert!(summary.totals.idle_backoffs >= 2);
    assert_eq!(summary.totals.iterations, 0);
    assert_eq!(summary.totals.iteration_errors, 0);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(summary.frontier_total, Some(0));
}

#[tokio::test]
async fn test_offline_workers_take_no_work() {
    let store = CountingStore::new(MemoryFrontier::with_ids((0..5).map(vid)), 0);
    let fetcher = Arc::new(GraphFetcher::default());
    let gate = SwitchGate::new(false);

    let supervisor = Arc::new(Supervisor::new(
        test_settings(2, 2, 5),
        test_store_settings(3),
        store.clone(),
        fetcher.clone(),
        gate.clone(),
    ));
    let (shutdown, handle) = start(supervisor);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.sample_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.calls(), 0);

    // Coming back online resumes work without a restart
    gate.online.store(true, Ordering::SeqCst);
    assert!(wait_until(|| fetcher.calls() > 0, Duration::from_secs(5)).await);

    let summary = stop(shutdown, handle).await;
    assert!(summary.totals.offline_backoffs >= 2);
    assert!(summary.totals.iterations >= 1);
}

#[tokio::test]
async fn test_unavailable_store_is_fatal_after_retry_cap() {
    let store = CountingStore::new(MemoryFrontier::new(), usize::MAX);
    let fetcher = Arc::new(GraphFetcher::default());

    let supervisor = Supervisor::new(
        test_settings(3, 2, 5),
        test_store_settings(3),
        store.clone(),
        fetcher.clone(),
        SwitchGate::new(true),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(CancellationToken::new()),
    )
    .await
    .expect("supervisor gives up within the timeout");

    assert!(matches!(
        result,
        Err(CrawlError::StoreUnavailable { attempts: 3 })
    ));
    assert_eq!(store.ready_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.sample_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_store_recovering_within_retry_cap() {
    let store = CountingStore::new(MemoryFrontier::with_ids([vid(1)]), 2);
    let fetcher = Arc::new(GraphFetcher::default());

    let supervisor = Arc::new(Supervisor::new(
        test_settings(1, 1, 1),
        test_store_settings(5),
        store.clone(),
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    assert!(wait_until(|| fetcher.calls() > 0, Duration::from_secs(5)).await);
    stop(shutdown, handle).await;

    assert_eq!(store.ready_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_shutdown_while_waiting_for_store() {
    let store = CountingStore::new(MemoryFrontier::new(), usize::MAX);
    let fetcher = Arc::new(GraphFetcher::default());

    let supervisor = Arc::new(Supervisor::new(
        test_settings(3, 2, 5),
        test_store_settings(1000),
        store,
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let summary = stop(shutdown, handle).await;

    assert_eq!(summary.workers_joined, 3);
    assert_eq!(summary.totals.iterations, 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_seeds_bootstrap_empty_frontier() {
    let seed = vid(1);
    let links = HashMap::from([(seed.clone(), vec![watch_href(&vid(2)), watch_href(&vid(3))])]);
    let store = Arc::new(MemoryFrontier::new());

    let supervisor = Arc::new(
        Supervisor::new(
            test_settings(1, 2, 5),
            test_store_settings(3),
            store.clone(),
            Arc::new(GraphFetcher::with_links(links)),
            SwitchGate::new(true),
        )
        .with_seeds(vec![seed.clone()]),
    );
    let (shutdown, handle) = start(supervisor);

    assert!(wait_until(|| store.snapshot().len() == 3, Duration::from_secs(5)).await);
    let summary = stop(shutdown, handle).await;

    assert!(store.snapshot().contains(&seed));
    assert_eq!(summary.totals.ids_merged, 2);
    assert_eq!(summary.frontier_total, Some(3));
}

#[tokio::test]
async fn test_cycles_in_link_graph_add_nothing() {
    let (a, b) = (vid(1), vid(2));
    let links = HashMap::from([
        (a.clone(), vec![watch_href(&b), format!("https://youtu.be/{}", b)]),
        (b.clone(), vec![watch_href(&a)]),
    ]);
    let store = Arc::new(MemoryFrontier::with_ids([a, b]));
    let fetcher = Arc::new(GraphFetcher::with_links(links));

    let supervisor = Arc::new(Supervisor::new(
        test_settings(2, 2, 2),
        test_store_settings(3),
        store.clone(),
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    assert!(wait_until(|| fetcher.calls() >= 10, Duration::from_secs(5)).await);
    let summary = stop(shutdown, handle).await;

    assert_eq!(store.snapshot().len(), 2);
    assert_eq!(summary.totals.ids_merged, 0);
    assert_eq!(summary.frontier_total, Some(2));
}

#[tokio::test]
async fn test_store_errors_mid_iteration_are_contained() {
    let (a, b) = (vid(1), vid(2));
    let links = HashMap::from([(a.clone(), vec![watch_href(&vid(3))])]);
    let store = CountingStore::with_faults(MemoryFrontier::with_ids([a, b]), 0, 1, 2);

    let supervisor = Arc::new(Supervisor::new(
        test_settings(1, 2, 2),
        test_store_settings(3),
        store.clone(),
        Arc::new(GraphFetcher::with_links(links)),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    assert!(wait_until(|| store.inner.snapshot().contains(&vid(3)), Duration::from_secs(5)).await);
    let summary = stop(shutdown, handle).await;

    // One failed sample and two failed merges, each survived by the worker
    assert_eq!(summary.totals.iteration_errors, 3);
    assert_eq!(summary.workers_joined, 1);
    assert_eq!(summary.workers_failed, 0);
    assert_eq!(summary.totals.ids_merged, 1);
    assert_eq!(summary.frontier_total, Some(3));
}

#[tokio::test]
async fn test_hung_fetch_is_bounded_by_fetch_timeout() {
    let (hung, live) = (vid(1), vid(2));
    let fetcher = Arc::new(GraphFetcher {
        hanging: [hung.clone()].into_iter().collect(),
        ..GraphFetcher::with_links(HashMap::from([(live.clone(), vec![watch_href(&vid(3))])]))
    });
    let store = Arc::new(MemoryFrontier::with_ids([hung, live]));

    let settings = CrawlerConfig {
        fetch_timeout_secs: 1,
        ..test_settings(1, 2, 2)
    };
    let supervisor = Arc::new(Supervisor::new(
        settings,
        test_store_settings(3),
        store.clone(),
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let budget = supervisor.fetch_budget();
    let (shutdown, handle) = start(Arc::clone(&supervisor));

    assert!(wait_until(|| store.snapshot().contains(&vid(3)), Duration::from_secs(5)).await);
    let summary = stop(shutdown, handle).await;

    assert!(summary.totals.fetches_failed >= 1);
    assert!(summary.totals.fetches_ok >= 1);
    assert_eq!(summary.totals.iteration_errors, 0);
    assert_eq!(budget.available(), budget.capacity());
}

#[tokio::test]
async fn test_empty_pages_back_off_between_batches() {
    let store = Arc::new(MemoryFrontier::with_ids((0..5).map(vid)));
    let fetcher = Arc::new(GraphFetcher::default());

    let supervisor = Arc::new(Supervisor::new(
        test_settings(1, 5, 5),
        test_store_settings(3),
        store,
        fetcher.clone(),
        SwitchGate::new(true),
    ));
    let (shutdown, handle) = start(supervisor);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let summary = stop(shutdown, handle).await;

    // One 20ms backoff per batch caps the pass rate
    assert!(summary.totals.iterations >= 1);
    assert!(
        summary.totals.iterations <= 15,
        "{} iterations",
        summary.totals.iterations
    );
    assert!(fetcher.calls() <= 5 * 16);
}

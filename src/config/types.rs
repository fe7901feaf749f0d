use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for yt-frontier
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub store: StoreConfig,
    pub fetcher: FetcherConfig,
    pub connectivity: ConnectivityConfig,

    /// Identifiers merged into the frontier at startup so an empty store can
    /// bootstrap the crawl
    pub seeds: Vec<String>,
}

/// Worker pool and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of crawl workers spawned by the supervisor
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Maximum number of page fetches in flight across all workers
    #[serde(rename = "fetch-concurrency")]
    pub fetch_concurrency: usize,

    /// Number of seeds sampled from the frontier per iteration
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Sleep after an empty sample or a failed iteration (milliseconds)
    #[serde(rename = "backoff-interval")]
    pub backoff_interval_ms: u64,

    /// Sleep while the connectivity gate reports the network down (milliseconds)
    #[serde(rename = "offline-backoff")]
    pub offline_backoff_ms: u64,

    /// Upper bound for a single page fetch (seconds)
    #[serde(rename = "fetch-timeout")]
    pub fetch_timeout_secs: u64,

    /// How long shutdown waits for workers before aborting them (seconds)
    #[serde(rename = "shutdown-grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            fetch_concurrency: 15,
            batch_size: 5,
            backoff_interval_ms: 2_000,
            offline_backoff_ms: 3_000,
            fetch_timeout_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

impl CrawlerConfig {
    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval_ms)
    }

    pub fn offline_backoff(&self) -> Duration {
        Duration::from_millis(self.offline_backoff_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Frontier store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Attempts made to reach the store before giving up at startup
    #[serde(rename = "retry-cap")]
    pub retry_cap: u32,

    /// Delay between startup attempts (milliseconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "./frontier.db".to_string(),
            retry_cap: 30,
            retry_delay_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Watch page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Origin that watch pages are requested from
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// TCP connect timeout for page requests (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// `host:port` that must accept a TCP connection for the network to count as up
    #[serde(rename = "probe-address")]
    pub probe_address: String,

    /// Probe timeout (milliseconds)
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_address: "1.1.1.1:53".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl ConnectivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

use crate::config::types::{Config, ConnectivityConfig, CrawlerConfig, FetcherConfig, StoreConfig};
use crate::identifier::VideoId;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_store_config(&config.store)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_connectivity_config(&config.connectivity)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 256 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 256, got {}",
            config.worker_count
        )));
    }

    if config.fetch_concurrency < 1 || config.fetch_concurrency > 1000 {
        return Err(ConfigError::Validation(format!(
            "fetch_concurrency must be between 1 and 1000, got {}",
            config.fetch_concurrency
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.backoff_interval_ms == 0 || config.offline_backoff_ms == 0 {
        return Err(ConfigError::Validation(
            "backoff intervals must be greater than zero".to_string(),
        ));
    }

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout must be at least 1s".to_string(),
        ));
    }

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.retry_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "store retry_cap must be >= 1, got {}",
            config.retry_cap
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the connectivity probe target
fn validate_connectivity_config(config: &ConnectivityConfig) -> Result<(), ConfigError> {
    match config.probe_address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
        _ => {
            return Err(ConfigError::Validation(format!(
                "probe_address must be host:port, got '{}'",
                config.probe_address
            )))
        }
    }

    if config.timeout_ms == 0 || config.timeout_ms > 5_000 {
        return Err(ConfigError::Validation(format!(
            "connectivity timeout must be between 1 and 5000ms, got {}ms",
            config.timeout_ms
        )));
    }

    Ok(())
}

/// Every configured seed must already be a canonical identifier
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        seed.parse::<VideoId>()
            .map_err(|_| ConfigError::InvalidSeed(seed.clone()))?;
    }
    Ok(())
}

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads, overrides and validates the configuration
///
/// Layering, lowest precedence first:
/// 1. Built-in defaults
/// 2. The TOML file at `path`, if one is given
/// 3. `YTF_*` environment variables (see [`apply_overrides`])
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, override, or validate
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use yt_frontier::config::load_config;
///
/// let config = load_config(Some(Path::new("frontier.toml"))).unwrap();
/// println!("Workers: {}", config.crawler.worker_count);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Parses TOML content without applying overrides or validation
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies environment overrides to a configuration
///
/// `lookup` resolves a variable name to its value; the binary passes
/// `std::env::var`, tests pass a map. `NUM_SCRAPERS` is accepted as an alias
/// for `YTF_WORKER_COUNT`, which wins when both are set.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let crawler = &mut config.crawler;
    override_value(&lookup, "NUM_SCRAPERS", &mut crawler.worker_count)?;
    override_value(&lookup, "YTF_WORKER_COUNT", &mut crawler.worker_count)?;
    override_value(&lookup, "YTF_FETCH_CONCURRENCY", &mut crawler.fetch_concurrency)?;
    override_value(&lookup, "YTF_BATCH_SIZE", &mut crawler.batch_size)?;
    override_value(&lookup, "YTF_BACKOFF_MS", &mut crawler.backoff_interval_ms)?;
    override_value(&lookup, "YTF_OFFLINE_BACKOFF_MS", &mut crawler.offline_backoff_ms)?;
    override_value(&lookup, "YTF_FETCH_TIMEOUT_SECS", &mut crawler.fetch_timeout_secs)?;
    override_value(&lookup, "YTF_SHUTDOWN_GRACE_SECS", &mut crawler.shutdown_grace_secs)?;

    let store = &mut config.store;
    override_value(&lookup, "YTF_STORE_RETRY_CAP", &mut store.retry_cap)?;
    override_value(&lookup, "YTF_STORE_RETRY_DELAY_MS", &mut store.retry_delay_ms)?;
    override_value(&lookup, "YTF_DATABASE_PATH", &mut store.database_path)?;

    Ok(())
}

fn override_value<F, T>(lookup: &F, name: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride {
                name: name.to_string(),
                value: raw.clone(),
            })?;
    }
    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs with different settings can be told apart.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its file hash
///
/// The hash is `None` when running on defaults without a file.
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_config(path)?;
    let hash = path.map(compute_config_hash).transpose()?;
    Ok((config, hash))
}

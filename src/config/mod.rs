//! Configuration module for yt-frontier
//!
//! This module handles loading, overriding, and validating the crawler
//! configuration. Settings come from built-in defaults, an optional TOML file,
//! and `YTF_*` environment variables, in that order.
//!
//! # Example
//!
//! ```no_run
//! use yt_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("frontier.toml"))).unwrap();
//! println!("Fetch budget: {}", config.crawler.fetch_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ConnectivityConfig, CrawlerConfig, FetcherConfig, StoreConfig};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;

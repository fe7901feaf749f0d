//! yt-frontier: a self-feeding YouTube link graph crawler
//!
//! This crate discovers video identifiers by visiting watch pages, harvesting
//! outbound video links, and merging the identifiers it finds back into a
//! persistent frontier that doubles as the crawl's own work queue.

pub mod config;
pub mod crawler;
pub mod identifier;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for yt-frontier operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Frontier store still unavailable after {attempts} attempts")]
    StoreUnavailable { attempts: u32 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid environment override {name}={value}")]
    InvalidOverride { name: String, value: String },

    #[error("Invalid seed identifier: {0}")]
    InvalidSeed(String),
}

/// Result type alias for yt-frontier operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSummary, Supervisor};
pub use identifier::{decode, DecodeFailure, VideoId};

//! Output module for frontier statistics and crawl summaries
//!
//! This module handles:
//! - Reading frontier statistics for the `--stats` mode
//! - Printing and logging the summary of a finished crawl

pub mod stats;

pub use stats::{
    load_statistics, log_crawl_summary, print_crawl_summary, print_statistics, FrontierStatistics,
};

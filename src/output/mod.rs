//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Summarizing the stored visited and discovered sets
//! - Printing the end-of-crawl report

pub mod stats;

pub use stats::{load_statistics, print_report, print_statistics, CrawlStatistics};

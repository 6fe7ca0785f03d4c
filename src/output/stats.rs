//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer, plus the end-of-crawl report.

use crate::crawler::CrawlReport;
use crate::storage::{RunRecord, Storage};
use crate::CrawlerError;
use std::collections::BTreeMap;

/// How many past runs `--stats` lists
pub const RECENT_RUN_LIMIT: usize = 5;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of visited articles
    pub visited: u64,

    /// Number of distinct discovered links
    pub discovered: u64,

    /// Visited articles per depth
    pub visited_by_depth: BTreeMap<u32, u64>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

impl CrawlStatistics {
    /// Discovered links that have not been visited yet
    pub fn pending(&self) -> u64 {
        self.discovered.saturating_sub(self.visited)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CrawlerError> {
    Ok(CrawlStatistics {
        visited: storage.count_visited()?,
        discovered: storage.count_links()?,
        visited_by_depth: storage.depth_breakdown()?,
        recent_runs: storage.recent_runs(RECENT_RUN_LIMIT)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Visited articles: {}", stats.visited);
    println!("  Discovered links: {}", stats.discovered);
    println!("  Not yet visited (approx.): {}", stats.pending());
    println!();

    if !stats.visited_by_depth.is_empty() {
        println!("Visited by Depth:");
        for (depth, count) in &stats.visited_by_depth {
            let percentage = if stats.visited > 0 {
                (*count as f64 / stats.visited as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", depth, count, percentage);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} [{}] depth {}, {} workers, {} processed",
                run.id,
                run.seed_url,
                run.status.to_db_string(),
                run.max_depth,
                run.workers,
                run.processed_count
            );
            println!(
                "     started {}{}",
                run.started_at,
                run.finished_at
                    .as_deref()
                    .map(|f| format!(", finished {}", f))
                    .unwrap_or_default()
            );
        }
    }
}

/// Prints the end-of-crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    let counts = &report.counts;
    let verb = if report.cancelled {
        "Crawl interrupted"
    } else {
        "Crawl completed"
    };

    println!(
        "{} in {:.2} seconds. Processed {} pages.",
        verb,
        report.elapsed.as_secs_f64(),
        counts.processed
    );
    if counts.skipped() > 0 || counts.failed() > 0 {
        println!(
            "  Skipped: {} (depth {}, duplicate {})",
            counts.skipped(),
            counts.depth_exceeded,
            counts.duplicates
        );
        println!(
            "  Failed: {} (fetch {}, store {})",
            counts.failed(),
            counts.fetch_failed,
            counts.store_failed
        );
    }
}

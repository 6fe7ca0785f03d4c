//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ItemOutcome`: how the crawl step for a single frontier item ended
//! - `CrawlState`: session-wide counters shared by all workers

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{CrawlCounts, CrawlState};
pub use outcome::ItemOutcome;

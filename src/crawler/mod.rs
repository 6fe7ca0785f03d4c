//! Crawler module for article fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier queue with completion tracking
//! - HTTP fetching with failure classification
//! - HTML parsing and article link extraction
//! - The worker pool that ties them together

mod engine;
mod fetcher;
mod frontier;
mod parser;

pub use engine::{run_crawl, CrawlEngine, CrawlReport};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchErrorKind};
pub use frontier::{Frontier, FrontierItem, Pop};
pub use parser::extract_links;

use crate::config::Config;
use crate::CrawlerError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the store and load the visited set
/// 2. Optionally clear previous records
/// 3. Build the HTTP client
/// 4. Crawl from the seed with the configured worker pool
/// 5. Record the run outcome and close the store
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Fingerprint of the config file, if one was loaded
/// * `seed_url` - A validated article URL to start from
/// * `fresh` - Discard previously stored records before crawling
/// * `cancel` - Stop signal observed by every worker
pub async fn crawl(
    config: Config,
    config_hash: Option<String>,
    seed_url: &str,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlerError> {
    let engine = CrawlEngine::new(config, config_hash)?;
    if fresh {
        engine.clear_records()?;
    }
    engine.run(seed_url, cancel).await
}

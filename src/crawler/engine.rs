//! Crawl engine - worker pool orchestration
//!
//! This module runs the crawl itself:
//! - Opening the store and recording the run
//! - Seeding the frontier and spawning the workers
//! - The per-item crawl step (depth check, claim, fetch, extract, commit,
//!   enqueue children)
//! - Completion detection and cooperative cancellation
//! - Joining workers and closing the store exactly once
//!
//! Visitation order is not strictly breadth-first: workers race, so the
//! depth recorded for a URL is the depth at which it was first successfully
//! processed, not necessarily its shortest distance from the seed.

use crate::config::{Config, DEFAULT_CONFIG_HASH};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::frontier::{Frontier, FrontierItem, Pop};
use crate::crawler::parser::extract_links;
use crate::state::{CrawlCounts, CrawlState, ItemOutcome};
use crate::storage::{Claim, LinkStore, RunStatus, StorageError};
use crate::CrawlerError;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Summary of a finished (or cancelled) crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Row ID of this run in the `runs` table
    pub run_id: i64,
    /// Per-outcome item counts
    pub counts: CrawlCounts,
    /// Wall-clock time from start to the last worker joining
    pub elapsed: Duration,
    /// True if the stop signal ended the crawl before the frontier drained
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn processed(&self) -> u64 {
        self.counts.processed
    }

    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        }
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerExit {
    Drained,
    Cancelled,
}

/// Everything a worker needs, shared behind one `Arc`
struct CrawlContext {
    store: Arc<LinkStore>,
    frontier: Frontier,
    state: CrawlState,
    client: Client,
    cancel: CancellationToken,
    max_depth: u32,
    dequeue_timeout: Duration,
    progress_interval: u64,
}

/// Concurrent, depth-bounded crawler over a single seed article
pub struct CrawlEngine {
    config: Config,
    config_hash: String,
    store: Arc<LinkStore>,
    client: Client,
}

impl CrawlEngine {
    /// Creates a new engine, opening the configured store
    ///
    /// A store that cannot be opened is fatal: no engine is returned and no
    /// worker is ever started.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Fingerprint of the config file, recorded on the run
    pub fn new(config: Config, config_hash: Option<String>) -> Result<Self, CrawlerError> {
        let store = LinkStore::open(Path::new(&config.output.database_path))?;
        let client = build_http_client(&config.user_agent, &config.fetch)?;

        Ok(Self {
            config,
            config_hash: config_hash.unwrap_or_else(|| DEFAULT_CONFIG_HASH.to_string()),
            store: Arc::new(store),
            client,
        })
    }

    /// The shared store this engine writes through
    pub fn store(&self) -> &LinkStore {
        &self.store
    }

    /// Removes all visited and discovered records before a fresh crawl
    pub fn clear_records(&self) -> Result<(), CrawlerError> {
        self.store.clear()?;
        tracing::info!("Cleared stored visited and discovered records");
        Ok(())
    }

    /// Runs the crawl from `seed_url` until the frontier drains or `cancel`
    /// fires
    ///
    /// The seed is assumed to have passed the article URL check already.
    /// Workers are always joined and the store is always closed before this
    /// returns, including on cancellation.
    pub async fn run(
        self,
        seed_url: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlReport, CrawlerError> {
        let crawler = &self.config.crawler;
        let started = Instant::now();

        let already_visited = self.store.visited_len()?;
        let run_id = self.store.start_run(
            seed_url,
            crawler.max_depth,
            crawler.workers,
            &self.config_hash,
        )?;
        tracing::info!(
            "Starting crawl run {} from {} (max depth {}, {} workers, {} articles already visited)",
            run_id,
            seed_url,
            crawler.max_depth,
            crawler.workers,
            already_visited
        );

        let ctx = Arc::new(CrawlContext {
            store: Arc::clone(&self.store),
            frontier: Frontier::new(),
            state: CrawlState::new(),
            client: self.client.clone(),
            cancel,
            max_depth: crawler.max_depth,
            dequeue_timeout: crawler.dequeue_timeout(),
            progress_interval: crawler.progress_interval.max(1),
        });
        ctx.frontier.push(FrontierItem::new(seed_url, 0));

        let handles: Vec<_> = (0..crawler.workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&ctx))))
            .collect();

        let mut cancelled = false;
        let mut join_error = None;
        for handle in handles {
            match handle.await {
                Ok(WorkerExit::Cancelled) => cancelled = true,
                Ok(WorkerExit::Drained) => {}
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    join_error.get_or_insert(e);
                }
            }
        }

        if cancelled && !ctx.frontier.is_empty() {
            tracing::info!(
                "Abandoning {} queued items on cancellation",
                ctx.frontier.len()
            );
        }

        let counts = ctx.state.snapshot();
        drop(ctx);

        let report = CrawlReport {
            run_id,
            counts,
            elapsed: started.elapsed(),
            cancelled,
        };

        if let Err(e) = self
            .store
            .finish_run(run_id, report.status(), report.processed())
        {
            tracing::error!("Failed to record end of run {}: {}", run_id, e);
        }

        if let Err(e) = self.close_store() {
            tracing::error!("Failed to close store cleanly: {}", e);
        }

        if let Some(e) = join_error {
            return Err(e.into());
        }

        if report.cancelled {
            tracing::info!(
                "Crawl interrupted after {:.2}s: {} pages processed",
                report.elapsed.as_secs_f64(),
                report.processed()
            );
        } else {
            tracing::info!(
                "Crawl completed in {:.2}s: {} pages processed, {} skipped, {} failed",
                report.elapsed.as_secs_f64(),
                report.processed(),
                report.counts.skipped(),
                report.counts.failed()
            );
        }

        Ok(report)
    }

    fn close_store(self) -> Result<(), StorageError> {
        let store = Arc::try_unwrap(self.store)
            .map_err(|shared| StorageError::StillShared(Arc::strong_count(&shared)))?;
        store.close()
    }
}

/// Drains the frontier until it is empty with nothing in flight, or until
/// the stop signal fires
async fn worker_loop(id: usize, ctx: Arc<CrawlContext>) -> WorkerExit {
    tracing::trace!("Worker {} started", id);

    loop {
        let popped = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Worker {} stopping on cancellation", id);
                return WorkerExit::Cancelled;
            }
            popped = ctx.frontier.pop(ctx.dequeue_timeout) => popped,
        };

        let held = match popped {
            Pop::Item(held) => held,
            // Idle wait; the select above re-checks the stop signal
            Pop::Empty => continue,
            Pop::Drained => {
                tracing::trace!("Worker {} found the frontier drained", id);
                return WorkerExit::Drained;
            }
        };

        let outcome = ctx.process_item(held.item()).await;
        // Marks the item done; also runs on unwind if processing panics
        drop(held);

        let processed = ctx.state.record(outcome);
        if outcome.is_success() && processed % ctx.progress_interval == 0 {
            tracing::info!(
                "Progress: {} pages processed, {} queued, {} in flight",
                processed,
                ctx.frontier.len(),
                ctx.frontier.in_flight()
            );
        }

        if outcome == ItemOutcome::Cancelled {
            return WorkerExit::Cancelled;
        }
    }
}

impl CrawlContext {
    /// Runs the crawl step for one dequeued item
    async fn process_item(&self, item: &FrontierItem) -> ItemOutcome {
        if item.depth > self.max_depth {
            tracing::debug!("Dropping {} at depth {}: beyond max depth", item.url, item.depth);
            return ItemOutcome::DepthExceeded;
        }

        match self.store.try_claim(&item.url) {
            Ok(Claim::Acquired) => {}
            Ok(Claim::Visited) | Ok(Claim::InFlight) => {
                tracing::trace!("Dropping duplicate {}", item.url);
                return ItemOutcome::Duplicate;
            }
            Err(e) => {
                tracing::error!("Store error while claiming {}: {}", item.url, e);
                return ItemOutcome::StoreFailed;
            }
        }

        let outcome = self.crawl_claimed(item).await;

        if !outcome.is_success() {
            if let Err(e) = self.store.release(&item.url) {
                tracing::error!("Store error while releasing {}: {}", item.url, e);
            }
        }

        outcome
    }

    /// Fetch, extract, commit and enqueue children for a claimed URL
    async fn crawl_claimed(&self, item: &FrontierItem) -> ItemOutcome {
        tracing::info!("Processing {} at depth {}", item.url, item.depth);

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ItemOutcome::Cancelled,
            fetched = fetch_page(&self.client, &item.url) => fetched,
        };

        let markup = match fetched {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!("Failed to fetch {} ({:?}): {}", item.url, e.kind(), e);
                return ItemOutcome::FetchFailed;
            }
        };

        let base_url = match Url::parse(&item.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot resolve links against {}: {}", item.url, e);
                return ItemOutcome::FetchFailed;
            }
        };
        let links: Vec<String> = extract_links(&markup, &base_url).into_iter().collect();
        tracing::debug!("Found {} article links on {}", links.len(), item.url);

        if let Err(e) = self.store.save_links(&links) {
            tracing::error!("Failed to save links from {}: {}", item.url, e);
            return ItemOutcome::StoreFailed;
        }

        // Filtered before the commit: a failure here must leave the URL unvisited
        let child_depth = item.depth + 1;
        let children: Vec<String> = if child_depth <= self.max_depth {
            match self.store.unvisited(&links) {
                Ok(children) => children
                    .into_iter()
                    .filter(|url| *url != item.url)
                    .collect(),
                Err(e) => {
                    tracing::error!("Failed to filter children of {}: {}", item.url, e);
                    return ItemOutcome::StoreFailed;
                }
            }
        } else {
            Vec::new()
        };

        match self.store.mark_visited(&item.url, item.depth) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("{} was recorded by another run first", item.url);
                return ItemOutcome::Duplicate;
            }
            Err(e) => {
                tracing::error!("Failed to mark {} visited: {}", item.url, e);
                return ItemOutcome::StoreFailed;
            }
        }

        self.frontier.extend(
            children
                .into_iter()
                .map(|url| FrontierItem::new(url, child_depth)),
        );

        ItemOutcome::Processed
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use wiki_crawler::config::Config;
/// use wiki_crawler::crawler::run_crawl;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(
///     Config::default(),
///     "https://en.wikipedia.org/wiki/Rust",
///     CancellationToken::new(),
/// )
/// .await?;
/// println!("processed {}", report.processed());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    seed_url: &str,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlerError> {
    let engine = CrawlEngine::new(config, None)?;
    engine.run(seed_url, cancel).await
}

//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Store lock poisoned by a panicked worker")]
    LockPoisoned,

    #[error("Store is still shared by {0} holders and cannot be closed")]
    StillShared(usize),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Operations take `&mut self` for writes; callers that share a backend
/// between workers wrap it in a single mutex (see `LinkStore`).
pub trait Storage {
    // ===== Visited records =====

    /// Durable membership check against the visited set
    fn is_visited(&self, url: &str) -> StorageResult<bool>;

    /// Inserts a visited record if absent
    ///
    /// Returns true if a new row was written, false if the URL was
    /// already present (the stored depth is left untouched).
    fn insert_visited(&mut self, url: &str, depth: u32) -> StorageResult<bool>;

    /// Loads every visited URL (used to seed the in-memory mirror)
    fn load_visited_urls(&self) -> StorageResult<Vec<String>>;

    /// Gets the stored depth of a visited URL
    fn visited_depth(&self, url: &str) -> StorageResult<Option<u32>>;

    // ===== Discovered links =====

    /// Inserts discovered links, ignoring ones already stored
    ///
    /// Returns the number of rows actually added.
    fn insert_links(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Durable membership check against the discovered-link set
    fn is_discovered(&self, url: &str) -> StorageResult<bool>;

    // ===== Run Management =====

    /// Creates a new crawl run in the running state
    fn create_run(
        &mut self,
        seed_url: &str,
        max_depth: u32,
        workers: usize,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Marks a run as finished with a final status and processed count
    fn finish_run(&mut self, run_id: i64, status: RunStatus, processed: u64) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Maintenance =====

    /// Removes all visited and discovered records (runs are kept)
    fn clear_records(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    fn count_visited(&self) -> StorageResult<u64>;

    fn count_links(&self) -> StorageResult<u64>;

    /// Gets visited count per depth
    fn depth_breakdown(&self) -> StorageResult<BTreeMap<u32, u64>>;
}

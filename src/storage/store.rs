//! Shared visited/discovered store used by the worker pool
//!
//! `LinkStore` puts the SQLite backend, the in-memory visited mirror and the
//! set of URLs currently claimed by workers behind one mutex. Every
//! operation takes that lock once, so a durable write and the matching
//! mirror update are never observed apart.

use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunStatus, SqliteStorage};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Result of trying to claim a URL for processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the URL until it commits or releases it
    Acquired,
    /// The URL is already in the visited set
    Visited,
    /// Another worker holds the URL right now
    InFlight,
}

struct Inner {
    storage: SqliteStorage,
    visited: HashSet<String>,
    claimed: HashSet<String>,
}

/// Durable, deduplicating record of visited and discovered URLs
pub struct LinkStore {
    inner: Mutex<Inner>,
}

impl LinkStore {
    /// Opens the store file and loads the visited mirror from it
    ///
    /// Failing here is fatal to a crawl: the engine never starts workers
    /// without durable storage.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::from_storage(SqliteStorage::new(path)?)
    }

    /// Wraps an already opened backend, loading the mirror from it
    pub fn from_storage(storage: SqliteStorage) -> StorageResult<Self> {
        let visited: HashSet<String> = storage.load_visited_urls()?.into_iter().collect();
        if !visited.is_empty() {
            tracing::info!("Loaded {} previously visited URLs", visited.len());
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                storage,
                visited,
                claimed: HashSet::new(),
            }),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Durable membership check
    pub fn is_visited(&self, url: &str) -> StorageResult<bool> {
        self.lock()?.storage.is_visited(url)
    }

    /// Atomically checks the mirror and claims the URL for this worker
    ///
    /// A URL can be claimed by at most one worker at a time; the claim ends
    /// with [`LinkStore::mark_visited`] or [`LinkStore::release`].
    pub fn try_claim(&self, url: &str) -> StorageResult<Claim> {
        let mut inner = self.lock()?;
        if inner.visited.contains(url) {
            return Ok(Claim::Visited);
        }
        if !inner.claimed.insert(url.to_string()) {
            return Ok(Claim::InFlight);
        }
        Ok(Claim::Acquired)
    }

    /// Drops a claim without recording the URL as visited
    pub fn release(&self, url: &str) -> StorageResult<()> {
        self.lock()?.claimed.remove(url);
        Ok(())
    }

    /// Records `url` as visited at `depth`, if it is not already
    ///
    /// The durable insert and the mirror insert happen under the same lock.
    /// Any claim on the URL ends here, whether or not the write succeeds.
    /// Returns true if this call created the record.
    pub fn mark_visited(&self, url: &str, depth: u32) -> StorageResult<bool> {
        let mut inner = self.lock()?;
        inner.claimed.remove(url);
        let inserted = inner.storage.insert_visited(url, depth)?;
        inner.visited.insert(url.to_string());
        Ok(inserted)
    }

    /// Records every URL in `links` as discovered
    pub fn save_links(&self, links: &[String]) -> StorageResult<usize> {
        self.lock()?.storage.insert_links(links)
    }

    /// Returns the links not yet in the visited mirror, in input order
    pub fn unvisited(&self, links: &[String]) -> StorageResult<Vec<String>> {
        let inner = self.lock()?;
        Ok(links
            .iter()
            .filter(|link| !inner.visited.contains(link.as_str()))
            .cloned()
            .collect())
    }

    /// Number of URLs in the mirror
    pub fn visited_len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.visited.len())
    }

    /// Clears visited and discovered records, durable and in memory
    pub fn clear(&self) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.storage.clear_records()?;
        inner.visited.clear();
        inner.claimed.clear();
        Ok(())
    }

    pub fn start_run(
        &self,
        seed_url: &str,
        max_depth: u32,
        workers: usize,
        config_hash: &str,
    ) -> StorageResult<i64> {
        self.lock()?
            .storage
            .create_run(seed_url, max_depth, workers, config_hash)
    }

    pub fn finish_run(&self, run_id: i64, status: RunStatus, processed: u64) -> StorageResult<()> {
        self.lock()?.storage.finish_run(run_id, status, processed)
    }

    /// Runs a read-only query against the backend under the store lock
    pub fn with_storage<T>(
        &self,
        f: impl FnOnce(&SqliteStorage) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let inner = self.lock()?;
        f(&inner.storage)
    }

    /// Closes the underlying connection
    pub fn close(self) -> StorageResult<()> {
        let inner = self
            .inner
            .into_inner()
            .map_err(|_| StorageError::LockPoisoned)?;
        inner.storage.close()
    }
}

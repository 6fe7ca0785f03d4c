use crate::state::ItemOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session crawl counters, shared by every worker
///
/// Owned by the engine and handed to workers behind an `Arc`; there is no
/// ambient global state.
#[derive(Debug, Default)]
pub struct CrawlState {
    processed: AtomicU64,
    depth_exceeded: AtomicU64,
    duplicates: AtomicU64,
    fetch_failed: AtomicU64,
    store_failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`CrawlState`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounts {
    pub processed: u64,
    pub depth_exceeded: u64,
    pub duplicates: u64,
    pub fetch_failed: u64,
    pub store_failed: u64,
    pub cancelled: u64,
}

impl CrawlCounts {
    /// Items dropped before any request was made
    pub fn skipped(&self) -> u64 {
        self.depth_exceeded + self.duplicates
    }

    /// Items dropped because of a failure
    pub fn failed(&self) -> u64 {
        self.fetch_failed + self.store_failed
    }
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one item
    ///
    /// Returns the processed count after this update, so the caller can
    /// decide whether to report progress without a second read.
    pub fn record(&self, outcome: ItemOutcome) -> u64 {
        let counter = match outcome {
            ItemOutcome::Processed => &self.processed,
            ItemOutcome::DepthExceeded => &self.depth_exceeded,
            ItemOutcome::Duplicate => &self.duplicates,
            ItemOutcome::FetchFailed => &self.fetch_failed,
            ItemOutcome::StoreFailed => &self.store_failed,
            ItemOutcome::Cancelled => &self.cancelled,
        };
        let after = counter.fetch_add(1, Ordering::AcqRel) + 1;

        if outcome.is_success() {
            after
        } else {
            self.processed()
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> CrawlCounts {
        CrawlCounts {
            processed: self.processed.load(Ordering::Acquire),
            depth_exceeded: self.depth_exceeded.load(Ordering::Acquire),
            duplicates: self.duplicates.load(Ordering::Acquire),
            fetch_failed: self.fetch_failed.load(Ordering::Acquire),
            store_failed: self.store_failed.load(Ordering::Acquire),
            cancelled: self.cancelled.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_returns_processed_count() {
        let state = CrawlState::new();
        assert_eq!(state.record(ItemOutcome::Processed), 1);
        assert_eq!(state.record(ItemOutcome::Duplicate), 1);
        assert_eq!(state.record(ItemOutcome::Processed), 2);
        assert_eq!(state.processed(), 2);
    }

    #[test]
    fn test_snapshot_groups() {
        let state = CrawlState::new();
        state.record(ItemOutcome::DepthExceeded);
        state.record(ItemOutcome::Duplicate);
        state.record(ItemOutcome::Duplicate);
        state.record(ItemOutcome::FetchFailed);
        state.record(ItemOutcome::StoreFailed);

        let counts = state.snapshot();
        assert_eq!(counts.skipped(), 3);
        assert_eq!(counts.failed(), 2);
        assert_eq!(counts.processed, 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let state = Arc::new(CrawlState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        state.record(ItemOutcome::Processed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.processed(), 8000);
    }
}

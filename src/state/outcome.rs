//! Terminal outcomes of the per-item crawl step
//!
//! Every frontier item a worker dequeues ends in exactly one of these.

use std::fmt;

/// How the crawl step for one frontier item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemOutcome {
    // ===== Success =====
    /// Fetched, extracted, recorded, children enqueued
    Processed,

    // ===== Drops =====
    /// Item depth was beyond the configured bound; nothing fetched
    DepthExceeded,

    /// URL already visited or claimed by another worker; nothing fetched
    Duplicate,

    /// Fetch or decode failed; URL not marked visited
    FetchFailed,

    /// A store write failed mid-crawl; URL not marked visited
    StoreFailed,

    /// Stop signal arrived while the item was being fetched
    Cancelled,
}

impl ItemOutcome {
    /// Returns true if the item was committed to the visited store
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true for drops that happened before any network request
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::DepthExceeded | Self::Duplicate)
    }

    /// Returns true for drops caused by a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::StoreFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::DepthExceeded => "depth_exceeded",
            Self::Duplicate => "duplicate",
            Self::FetchFailed => "fetch_failed",
            Self::StoreFailed => "store_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

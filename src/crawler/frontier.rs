//! Frontier queue shared by the worker pool
//!
//! An unbounded FIFO of `(url, depth)` items. Alongside the queue it counts
//! items that have been popped but not yet marked done, so completion is
//! only reported once the queue is empty *and* no worker holds an item that
//! could still push children.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A URL waiting to be crawled, with its link distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: String,
    pub depth: u32,
}

impl FrontierItem {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// What a worker gets back from [`Frontier::pop`]
#[derive(Debug)]
pub enum Pop<'a> {
    /// An item to process; it stays in flight until the guard is dropped
    Item(InFlight<'a>),
    /// Nothing arrived within the timeout; more work may still come
    Empty,
    /// Queue empty and nothing in flight; the crawl is finished
    Drained,
}

/// A dequeued item that counts as in flight until dropped
///
/// Dropping the guard marks the item done, including when the worker
/// holding it unwinds from a panic, so a failed worker can never keep the
/// frontier from draining. Children must be pushed before the guard goes.
pub struct InFlight<'a> {
    frontier: &'a Frontier,
    item: FrontierItem,
}

impl InFlight<'_> {
    pub fn item(&self) -> &FrontierItem {
        &self.item
    }
}

impl Deref for InFlight<'_> {
    type Target = FrontierItem;

    fn deref(&self) -> &FrontierItem {
        &self.item
    }
}

impl fmt::Debug for InFlight<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InFlight").field(&self.item).finish()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.frontier.mark_done();
    }
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<FrontierItem>,
    in_flight: usize,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.items.is_empty() && self.in_flight == 0
    }
}

/// Multi-producer, multi-consumer work queue with completion tracking
#[derive(Default)]
pub struct Frontier {
    state: Mutex<QueueState>,
    available: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded section never panics, so a poisoned lock still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item; never blocks
    pub fn push(&self, item: FrontierItem) {
        self.lock().items.push_back(item);
        self.available.notify_one();
    }

    /// Appends several items under one lock acquisition
    pub fn extend(&self, items: impl IntoIterator<Item = FrontierItem>) {
        let added = {
            let mut state = self.lock();
            let before = state.items.len();
            state.items.extend(items);
            state.items.len() - before
        };
        for _ in 0..added {
            self.available.notify_one();
        }
    }

    /// Waits up to `timeout` for an item
    ///
    /// Returns [`Pop::Drained`] immediately when there is nothing queued and
    /// nothing in flight, so idle workers can exit without waiting out the
    /// timeout.
    pub async fn pop(&self, timeout: Duration) -> Pop<'_> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking the queue so a push between
            // the check and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    state.in_flight += 1;
                    return Pop::Item(InFlight {
                        frontier: self,
                        item,
                    });
                }
                if state.in_flight == 0 {
                    return Pop::Drained;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Pop::Empty;
            }
        }
    }

    /// Marks a popped item as fully handled, children included
    ///
    /// Only called from [`InFlight`]'s drop. When this leaves the frontier
    /// drained, every idle worker is woken so it can observe completion.
    fn mark_done(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_drained()
        };
        if drained {
            self.available.notify_waiters();
        }
    }

    /// True when the queue is empty and no popped item is outstanding
    pub fn is_drained(&self) -> bool {
        self.lock().is_drained()
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Number of items popped but not yet marked done
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SHORT: Duration = Duration::from_millis(50);

    fn expect_item(popped: Pop<'_>) -> InFlight<'_> {
        match popped {
            Pop::Item(held) => held,
            other => panic!("expected an item, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));
        frontier.push(FrontierItem::new("b", 1));

        let first = expect_item(frontier.pop(SHORT).await);
        let second = expect_item(frontier.pop(SHORT).await);
        assert_eq!(*first.item(), FrontierItem::new("a", 0));
        assert_eq!(second.url, "b");
        assert_eq!(second.depth, 1);
    }

    #[tokio::test]
    async fn test_empty_frontier_is_drained() {
        let frontier = Frontier::new();
        assert!(matches!(frontier.pop(SHORT).await, Pop::Drained));
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_in_flight_item_blocks_completion() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));

        let held = expect_item(frontier.pop(SHORT).await);

        // Queue is empty but the item is still being worked on
        assert!(frontier.is_empty());
        assert!(!frontier.is_drained());
        assert!(matches!(frontier.pop(SHORT).await, Pop::Empty));

        drop(held);
        assert!(frontier.is_drained());
        assert!(matches!(frontier.pop(SHORT).await, Pop::Drained));
    }

    #[tokio::test]
    async fn test_child_pushed_before_done_is_seen() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));
        let held = expect_item(frontier.pop(SHORT).await);

        frontier.extend(vec![FrontierItem::new("b", 1), FrontierItem::new("c", 1)]);
        drop(held);

        assert!(!frontier.is_drained());
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waiting_pop_wakes_on_push() {
        let frontier = Arc::new(Frontier::new());
        frontier.push(FrontierItem::new("seed", 0));
        let _held = expect_item(frontier.pop(SHORT).await);

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                match frontier.pop(Duration::from_secs(5)).await {
                    Pop::Item(child) => Some(child.item().clone()),
                    _ => None,
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push(FrontierItem::new("child", 1));

        assert_eq!(waiter.await.unwrap(), Some(FrontierItem::new("child", 1)));
    }

    #[tokio::test]
    async fn test_waiting_pop_wakes_on_drain() {
        let frontier = Arc::new(Frontier::new());
        frontier.push(FrontierItem::new("seed", 0));
        let held = expect_item(frontier.pop(SHORT).await);

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                matches!(frontier.pop(Duration::from_secs(5)).await, Pop::Drained)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        let started = std::time::Instant::now();
        assert!(waiter.await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_panicking_holder_still_marks_done() {
        let frontier = Arc::new(Frontier::new());
        frontier.push(FrontierItem::new("seed", 0));

        let worker = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                let _held = expect_item(frontier.pop(SHORT).await);
                panic!("worker failed mid-item");
            })
        };

        let result = worker.await;
        assert!(result.unwrap_err().is_panic());
        assert_eq!(frontier.in_flight(), 0);
        assert!(matches!(frontier.pop(SHORT).await, Pop::Drained));
    }
}

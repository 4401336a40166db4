//! Bounded lock-free hand-off between pipeline roles.
//!
//! A thin wrapper over [`crossbeam_queue::ArrayQueue`] that adds the retry and
//! polling behavior the scheduler relies on. Nothing here blocks on a
//! synchronization primitive: absence of work or space is handled by sleeping
//! for the poll interval and trying again.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;

/// Delay between retries when a queue is full or empty
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Fixed-capacity multi-producer/multi-consumer queue
pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
    poll_interval: Duration,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize, poll_interval: Duration) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
            poll_interval,
        }
    }

    /// Push without waiting; hands the item back if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the item if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    /// Push, retrying after the poll interval while the queue is full.
    ///
    /// `cancelled` is checked between attempts so producers can give up when
    /// the pipeline is aborting.
    ///
    /// # Errors
    ///
    /// Returns the item if `cancelled` reported true before it could be queued.
    pub fn push_with_backoff(&self, mut item: T, cancelled: impl Fn() -> bool) -> Result<(), T> {
        loop {
            match self.inner.push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    if cancelled() {
                        return Err(rejected);
                    }
                    item = rejected;
                    self.idle();
                }
            }
        }
    }

    /// Pop without waiting
    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Pop, polling until an item arrives or `timeout` elapses
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.inner.pop() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    /// Sleep for one poll interval
    pub fn idle(&self) {
        thread::sleep(self.poll_interval);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

//! Liveness state shared by the pipeline roles.
//!
//! All cross-role coordination other than the two queues goes through one
//! [`SchedulerContext`]: the input-closed flag, one busy flag per worker, and
//! an abort flag. The termination rules live here so they can be exercised
//! without spawning threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::pipeline::queue::BoundedQueue;

#[derive(Debug)]
pub struct SchedulerContext {
    input_closed: AtomicBool,
    aborted: AtomicBool,
    busy: Vec<AtomicBool>,
}

impl SchedulerContext {
    pub fn new(workers: usize) -> Self {
        Self {
            input_closed: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            busy: (0..workers).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.busy.len()
    }

    /// Mark the task stream complete. One-way.
    pub fn close_input(&self) {
        self.input_closed.store(true, Ordering::SeqCst);
    }

    pub fn is_input_closed(&self) -> bool {
        self.input_closed.load(Ordering::SeqCst)
    }

    /// Ask every role to stop as soon as possible. One-way.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn set_busy(&self, worker: usize, busy: bool) {
        self.busy[worker].store(busy, Ordering::SeqCst);
    }

    pub fn is_busy(&self, worker: usize) -> bool {
        self.busy[worker].load(Ordering::SeqCst)
    }

    pub fn all_idle(&self) -> bool {
        self.busy.iter().all(|b| !b.load(Ordering::SeqCst))
    }

    /// A worker that found no task may exit once no more tasks can arrive.
    ///
    /// The emptiness check comes after the input-closed check: once input is
    /// closed every task has already been pushed.
    pub fn worker_may_exit<T>(&self, tasks: &BoundedQueue<T>) -> bool {
        self.is_input_closed() && tasks.is_empty()
    }

    /// The writer may exit once no more results can ever be produced.
    ///
    /// Checks run in dependency order: input closed (no new tasks), task queue
    /// empty (every task claimed), all workers idle (every claimed task has
    /// pushed its result, since a worker stays busy from before its pop until
    /// after its push), and finally result queue empty.
    pub fn writer_may_exit<T, R>(&self, tasks: &BoundedQueue<T>, results: &BoundedQueue<R>) -> bool {
        self.is_input_closed() && tasks.is_empty() && self.all_idle() && results.is_empty()
    }
}

/// Closes input when the reader finishes, fails, or panics
pub(crate) struct InputClosedGuard<'a>(pub(crate) &'a SchedulerContext);

impl Drop for InputClosedGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
        self.0.close_input();
    }
}

/// Clears a worker's busy flag when it exits, aborting the run if it panicked
pub(crate) struct WorkerGuard<'a> {
    pub(crate) ctx: &'a SchedulerContext,
    pub(crate) worker: usize,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.ctx.abort();
        }
        self.ctx.set_busy(self.worker, false);
    }
}

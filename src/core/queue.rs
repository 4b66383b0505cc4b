//! Bounded FIFO of pending jobs.
//!
//! `PendingQueue` is a plain data structure mutated through `&mut self`; the
//! pool wraps it in its single mutex together with the worker registry, and
//! layers the blocking enqueue/dequeue protocol (condvars, timeouts,
//! shutdown) on top.

use std::collections::VecDeque;

/// A type-erased unit of work. The closure owns its typed result slot and
/// posts the outcome itself, so the queue never sees result types.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of one blocking dequeue attempt.
pub(crate) enum Dequeued {
    /// A job was taken off the queue.
    Job(Job),
    /// Elastic mode only: one wait slice elapsed with no job; the worker
    /// evaluates its idle-exit policy.
    TimedOut,
    /// The pool signaled shutdown; reported even if jobs remain queued.
    ShuttingDown,
}

/// Ordered pending jobs, bounded by a capacity fixed at pool start.
pub(crate) struct PendingQueue {
    jobs: VecDeque<Job>,
    capacity: usize,
}

impl PendingQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity,
        }
    }

    /// Append a job. Fails when the queue is at capacity; the caller decides
    /// whether to wait for a slot or reject.
    pub(crate) fn push(&mut self, job: Job) -> Result<(), Job> {
        if self.jobs.len() >= self.capacity {
            return Err(job);
        }
        self.jobs.push_back(job);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Drop every queued job, returning how many were discarded. Dropping a
    /// job drops its slot writer, which resolves the paired handle.
    pub(crate) fn drain(&mut self) -> usize {
        let dropped = self.jobs.len();
        self.jobs.clear();
        dropped
    }
}

//! One-shot result handoff between a worker and the submitting thread.
//!
//! Each call to [`ThreadPool::submit`](crate::core::pool::ThreadPool::submit)
//! instantiates a [`ResultSlot`] for that call's result type. The producer
//! half ([`SlotWriter`]) is captured by the boxed job, so the queue stays
//! type-uniform while results stay fully typed; the consumer half
//! ([`TaskHandle`]) goes back to the caller.
//!
//! The rendezvous is a cell guarded by a `parking_lot` mutex plus a condvar.
//! The consumer re-checks the cell before and after every wait, so a value
//! posted before the consumer starts waiting is never missed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::error::PoolError;

/// Single-slot value cell with a readiness signal.
pub(crate) struct ResultSlot<R> {
    cell: Mutex<Option<Result<R, PoolError>>>,
    ready: Condvar,
}

impl<R> ResultSlot<R> {
    /// Create a connected writer/handle pair for one submission.
    pub(crate) fn channel() -> (SlotWriter<R>, TaskHandle<R>) {
        let slot = Arc::new(Self {
            cell: Mutex::new(None),
            ready: Condvar::new(),
        });
        (
            SlotWriter {
                slot: Arc::clone(&slot),
            },
            TaskHandle {
                inner: HandleInner::Live(slot),
            },
        )
    }

    /// Fill the cell if still empty and wake all waiters. A second post is
    /// ignored; the first value wins.
    fn post(&self, value: Result<R, PoolError>) {
        let mut cell = self.cell.lock();
        if cell.is_none() {
            *cell = Some(value);
            self.ready.notify_all();
        }
    }

    fn take_blocking(&self) -> Result<R, PoolError> {
        let mut cell = self.cell.lock();
        loop {
            if let Some(value) = cell.take() {
                return value;
            }
            self.ready.wait(&mut cell);
        }
    }

    fn take_deadline(&self, deadline: Instant) -> Result<R, PoolError> {
        let mut cell = self.cell.lock();
        loop {
            if let Some(value) = cell.take() {
                return value;
            }
            if self.ready.wait_until(&mut cell, deadline).timed_out() {
                return cell.take().unwrap_or(Err(PoolError::Timeout));
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.cell.lock().is_some()
    }
}

/// Producer half of a [`ResultSlot`], owned by the job closure.
///
/// Dropping the writer without posting (the job was discarded at shutdown)
/// posts `Err(Abandoned)` so the paired handle can never block forever.
pub(crate) struct SlotWriter<R> {
    slot: Arc<ResultSlot<R>>,
}

impl<R> SlotWriter<R> {
    /// Deliver the job's outcome to the waiting handle.
    pub(crate) fn post(self, value: Result<R, PoolError>) {
        self.slot.post(value);
    }
}

impl<R> Drop for SlotWriter<R> {
    fn drop(&mut self) {
        // No-op when an outcome was already posted.
        self.slot.post(Err(PoolError::Abandoned));
    }
}

enum HandleInner<R> {
    Live(Arc<ResultSlot<R>>),
    Rejected(PoolError),
}

/// Caller-held handle through which a submitted job's value is retrieved.
///
/// Retrieval consumes the handle, so a result can be delivered at most once;
/// a second `get` is a compile error rather than a runtime contract.
pub struct TaskHandle<R> {
    inner: HandleInner<R>,
}

impl<R> TaskHandle<R> {
    /// Create a pre-filled handle for a rejected submission. It is ready
    /// immediately and yields `err` without blocking.
    pub(crate) const fn rejected(err: PoolError) -> Self {
        Self {
            inner: HandleInner::Rejected(err),
        }
    }

    /// Whether the submission was accepted. Rejected handles still resolve,
    /// immediately, to the rejection error.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.inner, HandleInner::Live(_))
    }

    /// Non-blocking readiness probe. Rejected handles are always ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            HandleInner::Live(slot) => slot.is_ready(),
            HandleInner::Rejected(_) => true,
        }
    }

    /// Block until the job's outcome is available and return it.
    ///
    /// # Errors
    ///
    /// [`PoolError::NotRunning`] or [`PoolError::QueueFull`] if the
    /// submission was rejected (returned without blocking),
    /// [`PoolError::Panicked`] if the job body panicked, and
    /// [`PoolError::Abandoned`] if the job was discarded at shutdown.
    pub fn get(self) -> Result<R, PoolError> {
        match self.inner {
            HandleInner::Live(slot) => slot.take_blocking(),
            HandleInner::Rejected(err) => Err(err),
        }
    }

    /// Like [`get`](Self::get), but give up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] if no outcome was posted in time, otherwise as
    /// [`get`](Self::get).
    pub fn get_timeout(self, timeout: Duration) -> Result<R, PoolError> {
        match self.inner {
            HandleInner::Live(slot) => slot.take_deadline(Instant::now() + timeout),
            HandleInner::Rejected(err) => Err(err),
        }
    }
}

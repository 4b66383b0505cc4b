//! Pool orchestration: the single lock over queue and registry, the blocking
//! submit path, elastic growth, and the shutdown barrier.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::{PoolConfig, PoolMode};
use crate::core::error::PoolError;
use crate::core::handle::{ResultSlot, TaskHandle};
use crate::core::queue::{Dequeued, Job, PendingQueue};
use crate::core::worker::{self, WorkerSet};

/// How long a submission may wait for a queue slot before rejection.
pub(crate) const SUBMIT_WAIT: Duration = Duration::from_secs(1);
/// Wait slice between idle-policy checks for elastic workers.
pub(crate) const ELASTIC_POLL: Duration = Duration::from_secs(1);
/// Idle time after which an elastic worker beyond the initial set exits.
pub(crate) const MAX_IDLE: Duration = Duration::from_secs(3);

/// Everything guarded by the pool's single mutex. All mutations that bear on
/// correctness (enqueue, dequeue, spawn, reap, id assignment) happen here;
/// the atomic counters outside are advisory scheduling signals only.
pub(crate) struct PoolState {
    pub(crate) config: PoolConfig,
    pub(crate) pending: PendingQueue,
    pub(crate) workers: WorkerSet,
}

/// State shared between the pool front end and its worker threads.
pub(crate) struct PoolShared {
    pub(crate) state: Mutex<PoolState>,
    /// Signaled (broadcast) when jobs are appended, and at shutdown.
    pub(crate) not_empty: Condvar,
    /// Signaled once per dequeued job; submitters blocked on a full queue
    /// wait here.
    pub(crate) not_full: Condvar,
    /// Exit barrier: notified only by workers about to terminate, awaited
    /// only by shutdown.
    pub(crate) all_exited: Condvar,
    pub(crate) running: AtomicBool,
    pub(crate) counters: PoolCounters,
}

impl PoolShared {
    /// Pull the next job for a worker. `wait` is `None` in fixed mode (block
    /// until signaled) and one poll slice in elastic mode. Every wake checks
    /// shutdown first, so `ShuttingDown` is reported even when jobs remain.
    pub(crate) fn dequeue_blocking(&self, wait: Option<Duration>) -> Dequeued {
        let mut state = self.state.lock();
        loop {
            if !self.running.load(Ordering::Acquire) {
                return Dequeued::ShuttingDown;
            }
            if let Some(job) = state.pending.pop() {
                self.counters.pending_tasks.fetch_sub(1, Ordering::Relaxed);
                self.counters.idle_workers.fetch_sub(1, Ordering::Relaxed);
                if !state.pending.is_empty() {
                    // Other idle workers are valid wake targets too.
                    self.not_empty.notify_all();
                }
                self.not_full.notify_one();
                return Dequeued::Job(job);
            }
            match wait {
                None => self.not_empty.wait(&mut state),
                Some(slice) => {
                    if self.not_empty.wait_for(&mut state, slice).timed_out() {
                        return Dequeued::TimedOut;
                    }
                }
            }
        }
    }
}

/// Advisory counters, readable without the lock.
pub(crate) struct PoolCounters {
    pub(crate) current_workers: AtomicUsize,
    pub(crate) idle_workers: AtomicUsize,
    pub(crate) pending_tasks: AtomicUsize,
    pub(crate) submitted: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) panicked: AtomicU64,
}

impl PoolCounters {
    const fn new() -> Self {
        Self {
            current_workers: AtomicUsize::new(0),
            idle_workers: AtomicUsize::new(0),
            pending_tasks: AtomicUsize::new(0),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            current_workers: self.current_workers.load(Ordering::Relaxed),
            idle_workers: self.idle_workers.load(Ordering::Relaxed),
            pending_tasks: self.pending_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted.load(Ordering::Relaxed),
            completed_tasks: self.completed.load(Ordering::Relaxed),
            rejected_tasks: self.rejected.load(Ordering::Relaxed),
            panicked_tasks: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool utilization. Advisory: taken without the pool lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Workers currently alive.
    pub current_workers: usize,
    /// Workers currently waiting for work.
    pub idle_workers: usize,
    /// Jobs queued but not yet started.
    pub pending_tasks: usize,
    /// Total accepted submissions.
    pub submitted_tasks: u64,
    /// Total jobs that ran to completion.
    pub completed_tasks: u64,
    /// Total rejected submissions (not running, or queue full).
    pub rejected_tasks: u64,
    /// Total jobs whose body panicked.
    pub panicked_tasks: u64,
}

/// A worker pool over a bounded job queue.
///
/// Create with [`ThreadPool::new`], optionally reconfigure, then call
/// [`start`](Self::start). Configuration setters become no-ops once the pool
/// is running. Dropping the pool shuts it down.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
}

impl ThreadPool {
    /// Create an unstarted pool with the given configuration.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        let queue_capacity = config.queue_capacity;
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    config,
                    pending: PendingQueue::new(queue_capacity),
                    workers: WorkerSet::new(),
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                all_exited: Condvar::new(),
                running: AtomicBool::new(false),
                counters: PoolCounters::new(),
            }),
        }
    }

    /// Whether the pool is accepting submissions.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Set the elasticity mode. No-op once the pool has started.
    pub fn set_mode(&self, mode: PoolMode) {
        self.configure(|cfg| cfg.mode = mode);
    }

    /// Set the queue capacity. No-op once the pool has started.
    pub fn set_queue_capacity(&self, capacity: usize) {
        self.configure(|cfg| cfg.queue_capacity = capacity);
    }

    /// Set the elastic worker ceiling. No-op once the pool has started.
    pub fn set_max_workers(&self, max: usize) {
        self.configure(|cfg| cfg.max_workers = max);
    }

    /// Set the initial worker count. No-op once the pool has started.
    pub fn set_initial_workers(&self, count: usize) {
        self.configure(|cfg| cfg.initial_workers = count);
    }

    fn configure(&self, apply: impl FnOnce(&mut PoolConfig)) {
        let mut state = self.shared.state.lock();
        if self.shared.running.load(Ordering::Acquire) {
            warn!("pool already started, configuration change ignored");
            return;
        }
        apply(&mut state.config);
    }

    /// Start the pool: spawn the initial workers and begin accepting
    /// submissions. A second start, or a start with an invalid
    /// configuration, is a warned no-op.
    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        if self.shared.running.load(Ordering::Acquire) {
            warn!("pool already running, start ignored");
            return;
        }
        if let Err(e) = state.config.validate() {
            warn!(error = %e, "invalid configuration, start aborted");
            return;
        }
        state.pending = PendingQueue::new(state.config.queue_capacity);
        self.shared.running.store(true, Ordering::Release);
        let initial = state.config.initial_workers;
        for id in 0..initial {
            worker::spawn(&self.shared, &mut state, id);
        }
        info!(initial_workers = initial, mode = ?state.config.mode, "pool started");
    }

    /// Submit a job, returning the handle for its result.
    ///
    /// Never blocks longer than the one-second backpressure wait and never
    /// panics: a rejected submission (pool not running, or queue still full
    /// after the wait) yields an immediately-ready handle carrying the
    /// rejection error instead.
    ///
    /// In elastic mode an accepted submission may spawn one new worker when
    /// the backlog exceeds the idle workers and the ceiling permits.
    pub fn submit<F, R>(&self, job: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if !self.is_running() {
            warn!("pool is not running, submission rejected");
            self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return TaskHandle::rejected(PoolError::NotRunning);
        }

        let mut state = self.shared.state.lock();
        let deadline = Instant::now() + SUBMIT_WAIT;
        loop {
            // Re-checked on every wake: a submission racing shutdown must
            // resolve to rejected, never to a handle that blocks forever.
            if !self.shared.running.load(Ordering::Acquire) {
                warn!("pool is not running, submission rejected");
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return TaskHandle::rejected(PoolError::NotRunning);
            }
            if !state.pending.is_full() {
                break;
            }
            if self
                .shared
                .not_full
                .wait_until(&mut state, deadline)
                .timed_out()
                && state.pending.is_full()
            {
                warn!("task queue is full, submission rejected");
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return TaskHandle::rejected(PoolError::QueueFull);
            }
        }

        let (writer, handle) = ResultSlot::channel();
        let shared = Arc::clone(&self.shared);
        let boxed: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let msg = panic_message(&*payload);
                warn!(panic = %msg, "job body panicked");
                PoolError::Panicked(msg)
            });
            match &outcome {
                Ok(_) => shared.counters.completed.fetch_add(1, Ordering::Relaxed),
                Err(_) => shared.counters.panicked.fetch_add(1, Ordering::Relaxed),
            };
            writer.post(outcome);
        });

        if let Err(job) = state.pending.push(boxed) {
            // Not reachable: fullness was checked under this same lock.
            // Dropping the job resolves the handle through the writer.
            drop(job);
            self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return handle;
        }
        self.shared.counters.pending_tasks.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.not_empty.notify_all();

        if state.config.mode == PoolMode::Elastic {
            let idle = self.shared.counters.idle_workers.load(Ordering::Relaxed);
            let live = state.workers.len();
            if state.pending.len() > idle && live < state.config.max_workers {
                let id = state.workers.next_free_id(state.config.initial_workers);
                info!(worker_id = id, live = live + 1, "spawning elastic worker");
                worker::spawn(&self.shared, &mut state, id);
            }
        }

        handle
    }

    /// Shut down the pool: stop accepting submissions, discard jobs still
    /// only queued (their handles resolve to
    /// [`PoolError::Abandoned`]), let in-flight jobs finish, and block until
    /// every worker has removed itself from the registry. Idempotent.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("shutting down pool");
        let mut state = self.shared.state.lock();
        let dropped = state.pending.drain();
        if dropped > 0 {
            self.shared.counters.pending_tasks.store(0, Ordering::Relaxed);
            debug!(dropped, "discarded queued jobs at shutdown");
        }
        self.shared.not_empty.notify_all();
        // Submitters blocked on a full queue re-check `running` on wake.
        self.shared.not_full.notify_all();
        while !state.workers.is_empty() {
            self.shared.all_exited.wait(&mut state);
        }
        info!("all workers stopped");
    }

    /// Advisory snapshot of the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot()
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_string())
}

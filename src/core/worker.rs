//! Worker threads and the id-keyed worker registry.
//!
//! Workers run detached: the `JoinHandle` is dropped at spawn, and the
//! registry of [`WorkerRecord`]s is the single source of truth for how many
//! workers exist. A worker only ever removes its own record, from its idle
//! path, under the pool's lock; shutdown waits on the exit barrier until the
//! registry is empty instead of joining threads.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error};

use crate::config::PoolMode;
use crate::core::pool::{PoolShared, PoolState, ELASTIC_POLL, MAX_IDLE};
use crate::core::queue::Dequeued;

/// One live worker: its stable id and a handle to the running thread.
pub(crate) struct WorkerRecord {
    pub(crate) id: usize,
    pub(crate) thread: thread::Thread,
}

/// The set of live workers, keyed by id. Ids `0..initial_workers` belong to
/// the fixed workers for the pool's lifetime; elastic ids are assigned by
/// scanning upward from `initial_workers` for the lowest id not in use, so a
/// reaped worker's id is reused. Mutated only under the pool's lock.
pub(crate) struct WorkerSet {
    records: HashMap<usize, WorkerRecord>,
}

impl WorkerSet {
    pub(crate) fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, record: WorkerRecord) {
        self.records.insert(record.id, record);
    }

    pub(crate) fn remove(&mut self, id: usize) -> Option<WorkerRecord> {
        self.records.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lowest free id at or above the fixed-id range.
    pub(crate) fn next_free_id(&self, initial_workers: usize) -> usize {
        let mut id = initial_workers;
        while self.records.contains_key(&id) {
            id += 1;
        }
        id
    }
}

/// Spawn a worker thread and register it. Must be called with the pool lock
/// held, so the new record lands in the registry before anyone else can
/// observe the id as free.
pub(crate) fn spawn(shared: &Arc<PoolShared>, state: &mut PoolState, id: usize) {
    let mode = state.config.mode;
    let pool = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name(format!("workpool-worker-{id}"))
        .spawn(move || run(&pool, id, mode));
    match spawned {
        Ok(join) => {
            state.workers.insert(WorkerRecord {
                id,
                thread: join.thread().clone(),
            });
            // Detached: the JoinHandle is dropped here; the exit barrier
            // substitutes for join semantics.
            shared.counters.current_workers.fetch_add(1, Ordering::Relaxed);
            shared.counters.idle_workers.fetch_add(1, Ordering::Relaxed);
            debug!(worker_id = id, "worker thread started");
        }
        Err(e) => {
            error!(worker_id = id, error = %e, "failed to spawn worker thread");
        }
    }
}

/// The worker loop: Idle -> (dequeue) -> Executing -> Idle, exiting on
/// shutdown or, in elastic mode, after idling past the reap threshold.
fn run(shared: &PoolShared, id: usize, mode: PoolMode) {
    let wait = match mode {
        PoolMode::Fixed => None,
        PoolMode::Elastic => Some(ELASTIC_POLL),
    };
    let mut last_active = Instant::now();
    loop {
        match shared.dequeue_blocking(wait) {
            Dequeued::Job(job) => {
                debug!(worker_id = id, "executing job");
                // Outside the lock. Panics are contained inside the job
                // closure and surface through the task's own handle.
                job();
                shared.counters.idle_workers.fetch_add(1, Ordering::Relaxed);
                last_active = Instant::now();
            }
            Dequeued::TimedOut => {
                if try_reap(shared, id, last_active) {
                    return;
                }
            }
            Dequeued::ShuttingDown => {
                retire(shared, id);
                return;
            }
        }
    }
}

/// Idle-exit policy for elastic workers. Re-checks everything under the lock:
/// the idle clock, the fixed-worker floor, and that no job arrived between
/// the timed-out wait and this decision.
fn try_reap(shared: &PoolShared, id: usize, last_active: Instant) -> bool {
    let mut state = shared.state.lock();
    if last_active.elapsed() < MAX_IDLE {
        return false;
    }
    if state.workers.len() <= state.config.initial_workers {
        return false;
    }
    if !state.pending.is_empty() {
        return false;
    }
    if let Some(record) = state.workers.remove(id) {
        shared.counters.current_workers.fetch_sub(1, Ordering::Relaxed);
        shared.counters.idle_workers.fetch_sub(1, Ordering::Relaxed);
        debug!(worker_id = record.id, thread = ?record.thread.id(), "idle worker reaped");
        return true;
    }
    false
}

/// Shutdown exit: remove the own record and signal the exit barrier.
fn retire(shared: &PoolShared, id: usize) {
    let mut state = shared.state.lock();
    if let Some(record) = state.workers.remove(id) {
        shared.counters.current_workers.fetch_sub(1, Ordering::Relaxed);
        shared.counters.idle_workers.fetch_sub(1, Ordering::Relaxed);
        debug!(worker_id = record.id, thread = ?record.thread.id(), "worker exiting on shutdown");
    }
    shared.all_exited.notify_all();
}

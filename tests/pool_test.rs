//! Integration tests for the worker pool.
//!
//! These tests validate the observable contract:
//! - Basic submission and typed result retrieval
//! - Queue bound and the 1-second backpressure wait (both branches)
//! - FIFO order among already-queued jobs
//! - Elastic growth bound and idle reaping
//! - Panic isolation
//! - Clean shutdown, including abandonment of queued-but-unstarted jobs
//!
//! Long-running jobs are gated with crossbeam channels so the tests control
//! exactly when workers become free.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use workpool::{PoolConfig, PoolError, PoolMode, ThreadPool};

fn fixed_pool(workers: usize, capacity: usize) -> ThreadPool {
    workpool::util::init_tracing();
    let pool = ThreadPool::new(
        PoolConfig::new()
            .with_initial_workers(workers)
            .with_queue_capacity(capacity),
    );
    pool.start();
    pool
}

#[test]
fn basic_submit_and_get() {
    let pool = fixed_pool(2, 64);

    let a = pool.submit(|| 5 + 3);
    let b = pool.submit(|| "hello".to_string());
    let c = pool.submit(|| (1..=100u64).sum::<u64>());

    assert_eq!(a.get().unwrap(), 8);
    assert_eq!(b.get().unwrap(), "hello");
    assert_eq!(c.get().unwrap(), 5050);

    let stats = pool.stats();
    assert_eq!(stats.submitted_tasks, 3);
    assert_eq!(stats.completed_tasks, 3);
    pool.shutdown();
}

#[test]
fn many_tasks_all_delivered() {
    let pool = fixed_pool(4, 1024);

    let handles: Vec<_> = (0..100u64).map(|i| pool.submit(move || i * 2)).collect();
    let total: u64 = handles.into_iter().map(|h| h.get().unwrap()).sum();
    assert_eq!(total, (0..100u64).map(|i| i * 2).sum::<u64>());

    pool.shutdown();
    assert_eq!(pool.stats().completed_tasks, 100);
}

#[test]
fn fifo_among_queued() {
    let pool = fixed_pool(1, 64);
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

    // Occupy the only worker so the next submissions stay queued.
    let blocker = pool.submit(move || {
        started_tx.send(()).unwrap();
        let _ = gate_rx.recv();
    });
    started_rx.recv().unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let order_a = Arc::clone(&order);
    let order_b = Arc::clone(&order);
    let a = pool.submit(move || order_a.lock().unwrap().push("a"));
    let b = pool.submit(move || order_b.lock().unwrap().push("b"));

    drop(gate_tx);
    blocker.get().unwrap();
    a.get().unwrap();
    b.get().unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    pool.shutdown();
}

#[test]
fn full_queue_rejects_after_one_second() {
    let pool = fixed_pool(2, 2);
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

    // Both workers busy, then fill both queue slots.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let gate_rx = gate_rx.clone();
        let started_tx = started_tx.clone();
        handles.push(pool.submit(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
        }));
    }
    started_rx.recv().unwrap();
    started_rx.recv().unwrap();
    for _ in 0..2 {
        handles.push(pool.submit(|| ()));
    }

    // No slot frees: the third queued submission waits ~1s, then rejects.
    let start = Instant::now();
    let rejected = pool.submit(|| ());
    let elapsed = start.elapsed();
    assert!(!rejected.is_valid());
    assert!(rejected.is_ready());
    assert_eq!(rejected.get(), Err(PoolError::QueueFull));
    assert!(elapsed >= Duration::from_millis(900), "rejected too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "rejection overran: {elapsed:?}");

    drop(gate_tx);
    for handle in handles {
        handle.get().unwrap();
    }
    assert_eq!(pool.stats().rejected_tasks, 1);
    pool.shutdown();
}

#[test]
fn full_queue_accepts_when_a_slot_frees() {
    let pool = fixed_pool(1, 1);
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

    let blocker = pool.submit(move || {
        started_tx.send(()).unwrap();
        let _ = gate_rx.recv();
    });
    started_rx.recv().unwrap();
    let filler = pool.submit(|| ());

    // Free the worker mid-wait; the queued filler drains and the waiting
    // submission takes its slot inside the 1-second window.
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        drop(gate_tx);
    });

    let start = Instant::now();
    let late = pool.submit(|| 99);
    assert!(late.is_valid());
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(late.get(), Ok(99));

    releaser.join().unwrap();
    blocker.get().unwrap();
    filler.get().unwrap();
    pool.shutdown();
}

#[test]
fn elastic_growth_stops_at_ceiling() {
    let pool = ThreadPool::new(
        PoolConfig::new()
            .with_mode(PoolMode::Elastic)
            .with_initial_workers(1)
            .with_max_workers(4)
            .with_queue_capacity(64),
    );
    pool.start();
    assert_eq!(pool.stats().current_workers, 1);

    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let mut handles = Vec::new();
    for _ in 0..5 {
        let gate_rx = gate_rx.clone();
        handles.push(pool.submit(move || {
            let _ = gate_rx.recv();
        }));
        // Let the previous spawn settle so growth demand is observable.
        thread::sleep(Duration::from_millis(20));
    }

    // Four gated jobs in flight, one queued: grown to the ceiling, no further.
    assert_eq!(pool.stats().current_workers, 4);

    drop(gate_tx);
    for handle in handles {
        handle.get().unwrap();
    }
    assert!(pool.stats().current_workers <= 4);
    pool.shutdown();
}

#[test]
fn elastic_workers_are_reaped_after_idle() {
    let pool = ThreadPool::new(
        PoolConfig::new()
            .with_mode(PoolMode::Elastic)
            .with_initial_workers(1)
            .with_max_workers(4)
            .with_queue_capacity(64),
    );
    pool.start();

    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let gate_rx = gate_rx.clone();
        handles.push(pool.submit(move || {
            let _ = gate_rx.recv();
        }));
        thread::sleep(Duration::from_millis(20));
    }
    assert!(pool.stats().current_workers > 1);

    drop(gate_tx);
    for handle in handles {
        handle.get().unwrap();
    }

    // Reap threshold is 3s of idleness, checked on 1s wait slices.
    thread::sleep(Duration::from_millis(4500));
    assert_eq!(pool.stats().current_workers, 1);

    // The survivor still serves work.
    assert_eq!(pool.submit(|| 7).get(), Ok(7));
    pool.shutdown();
}

#[test]
fn fixed_workers_never_reap() {
    let pool = fixed_pool(2, 64);
    thread::sleep(Duration::from_millis(4500));
    assert_eq!(pool.stats().current_workers, 2);
    assert_eq!(pool.submit(|| 1).get(), Ok(1));
    pool.shutdown();
}

#[test]
fn panic_is_isolated_to_its_handle() {
    let pool = fixed_pool(2, 64);

    let bad = pool.submit(|| -> u32 { panic!("boom") });
    match bad.get() {
        Err(PoolError::Panicked(msg)) => assert!(msg.contains("boom")),
        other => panic!("expected Panicked, got {other:?}"),
    }

    // The pool stays usable and other tasks are unaffected.
    assert_eq!(pool.submit(|| 41 + 1).get(), Ok(42));

    let stats = pool.stats();
    assert_eq!(stats.panicked_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);
    pool.shutdown();
    assert_eq!(pool.stats().current_workers, 0);
}

#[test]
fn clean_shutdown_stops_every_worker() {
    let pool = fixed_pool(4, 64);
    let handles: Vec<_> = (0..16u64).map(|i| pool.submit(move || i)).collect();
    for handle in handles {
        handle.get().unwrap();
    }

    pool.shutdown();
    assert_eq!(pool.stats().current_workers, 0);
    assert_eq!(pool.stats().idle_workers, 0);

    // A second shutdown is a no-op.
    pool.shutdown();

    let late = pool.submit(|| 3);
    assert!(!late.is_valid());
    assert_eq!(late.get(), Err(PoolError::NotRunning));
}

#[test]
fn shutdown_abandons_queued_jobs_but_finishes_inflight() {
    let pool = fixed_pool(1, 64);
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

    let inflight = pool.submit(move || {
        started_tx.send(()).unwrap();
        let _ = gate_rx.recv();
        "finished"
    });
    started_rx.recv().unwrap();

    let queued_a = pool.submit(|| 1);
    let queued_b = pool.submit(|| 2);

    // Unblock the in-flight job shortly after shutdown begins waiting.
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        drop(gate_tx);
    });

    pool.shutdown();
    releaser.join().unwrap();

    assert_eq!(pool.stats().current_workers, 0);
    assert_eq!(inflight.get(), Ok("finished"));
    assert_eq!(queued_a.get(), Err(PoolError::Abandoned));
    assert_eq!(queued_b.get(), Err(PoolError::Abandoned));
}

#[test]
fn dropping_the_pool_shuts_it_down() {
    let pool = fixed_pool(2, 64);
    let handle = pool.submit(|| 10u8);
    assert_eq!(handle.get(), Ok(10));
    drop(pool);
}

//! # workpool
//!
//! A general-purpose worker pool: a bounded queue of jobs consumed by a
//! managed set of background OS threads, with two elasticity policies and a
//! per-submission handle for retrieving the computed result.
//!
//! ## Core Problem Solved
//!
//! CPU-bound batch work needs a place to run that is not the caller's thread:
//!
//! - **Backpressure**: submissions block briefly when the queue is full, then
//!   are rejected rather than growing memory without bound
//! - **Elasticity**: the pool can run a constant worker set (`Fixed`) or grow
//!   one worker at a time under load and reap workers idle too long (`Elastic`)
//! - **Typed results**: each submission returns a [`TaskHandle`] for that
//!   call's result type; the queue itself stays homogeneous
//! - **Fault isolation**: a panicking job surfaces through its own handle and
//!   never takes down a worker thread or the pool
//!
//! ## Example
//!
//! ```rust
//! use workpool::{PoolConfig, PoolMode, ThreadPool};
//!
//! let pool = ThreadPool::new(
//!     PoolConfig::new()
//!         .with_mode(PoolMode::Elastic)
//!         .with_initial_workers(2)
//!         .with_max_workers(8),
//! );
//! pool.start();
//!
//! let handle = pool.submit(|| (1..=100u64).sum::<u64>());
//! assert_eq!(handle.get().unwrap(), 5050);
//!
//! pool.shutdown();
//! ```
//!
//! Workers run detached; [`ThreadPool::shutdown`] (or dropping the pool) waits
//! on an exit barrier until every worker has removed itself from the registry,
//! so no pool thread outlives the pool. Jobs still queued but not started when
//! shutdown begins are discarded, and their handles resolve to
//! [`PoolError::Abandoned`] instead of hanging.

/// Core pool machinery: queue, workers, handles, and orchestration.
pub mod core;
/// Configuration models for pool mode and sizing.
pub mod config;
/// Shared utilities.
pub mod util;

pub use crate::config::{PoolConfig, PoolMode};
pub use crate::core::{AppResult, PoolError, PoolStats, TaskHandle, ThreadPool};

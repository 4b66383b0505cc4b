//! Error types for pool operations.

use thiserror::Error;

/// Errors surfaced through submission handles and pool operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has not been started, or has been shut down.
    #[error("pool is not running")]
    NotRunning,
    /// The queue stayed at capacity for the whole submission wait.
    #[error("task queue is full")]
    QueueFull,
    /// The job body panicked; the message is the panic payload.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The job was still queued, never started, when the pool shut down.
    #[error("task abandoned at shutdown")]
    Abandoned,
    /// A bounded wait on a handle expired before the result was posted.
    #[error("timed out waiting for result")]
    Timeout,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

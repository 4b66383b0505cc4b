//! Core pool machinery: queue, workers, handles, and orchestration.

pub mod error;
pub mod handle;
pub mod pool;
pub(crate) mod queue;
pub(crate) mod worker;

pub use error::{AppResult, PoolError};
pub use handle::TaskHandle;
pub use pool::{PoolStats, ThreadPool};

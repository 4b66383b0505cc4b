//! Configuration models for pool mode and sizing.

pub mod pool;

pub use pool::{PoolConfig, PoolMode};

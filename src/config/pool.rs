//! Pool configuration: elasticity mode, queue bound, and worker counts.

use serde::{Deserialize, Serialize};

/// Worker-count policy for the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// A constant number of workers for the pool's lifetime.
    #[default]
    Fixed,
    /// Workers grow on demand up to `max_workers` and are reaped after
    /// idling past the reap threshold.
    Elastic,
}

/// Default ceiling on elastic growth.
pub const DEFAULT_MAX_WORKERS: usize = 100;

/// Pool configuration. Mutable only before the pool is started; the pool's
/// setters become no-ops once it is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker-count policy.
    pub mode: PoolMode,
    /// Maximum queued jobs before submissions are rejected. Defaults to an
    /// effectively unbounded sentinel.
    pub queue_capacity: usize,
    /// Ceiling on the live worker count in elastic mode.
    pub max_workers: usize,
    /// Workers spawned at start; these never self-terminate.
    pub initial_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::default(),
            queue_capacity: usize::MAX,
            max_workers: DEFAULT_MAX_WORKERS,
            initial_workers: num_cpus::get(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values: fixed mode, one initial
    /// worker per available CPU, an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the elasticity mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: PoolMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the elastic-mode worker ceiling.
    #[must_use]
    pub const fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    /// Set the number of workers spawned at start.
    #[must_use]
    pub const fn with_initial_workers(mut self, count: usize) -> Self {
        self.initial_workers = count;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.initial_workers == 0 {
            return Err("initial_workers must be greater than 0".into());
        }
        if self.max_workers < self.initial_workers {
            return Err("max_workers must be at least initial_workers".into());
        }
        Ok(())
    }

    /// Parse a pool configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PoolConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.mode, PoolMode::Fixed);
        assert_eq!(cfg.max_workers, DEFAULT_MAX_WORKERS);
        assert!(cfg.initial_workers >= 1);
    }

    #[test]
    fn rejects_zero_capacity() {
        let cfg = PoolConfig::new().with_queue_capacity(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_ceiling_below_initial() {
        let cfg = PoolConfig::new().with_initial_workers(8).with_max_workers(4);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_json() {
        let cfg = PoolConfig::from_json_str(
            r#"{"mode":"elastic","queue_capacity":64,"max_workers":16,"initial_workers":4}"#,
        )
        .unwrap();
        assert_eq!(cfg.mode, PoolMode::Elastic);
        assert_eq!(cfg.queue_capacity, 64);
        assert_eq!(cfg.max_workers, 16);
        assert_eq!(cfg.initial_workers, 4);
    }

    #[test]
    fn json_validation_failure_surfaces() {
        let err = PoolConfig::from_json_str(
            r#"{"mode":"fixed","queue_capacity":0,"max_workers":4,"initial_workers":2}"#,
        )
        .unwrap_err();
        assert!(err.contains("queue_capacity"));
    }
}

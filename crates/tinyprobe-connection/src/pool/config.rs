//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tinyprobe_core::{ProbeError, Result};

/// Configuration for a connection pool
///
/// Controls pool sizing, timeouts, and connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Connections the pool opens eagerly on [`warm_up`](super::ConnectionPool::warm_up)
    min_size: usize,
    /// Maximum number of open connections (idle + in use)
    max_size: usize,
    /// Maximum number of idle connections kept for reuse
    max_idle: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    acquire_timeout_ms: u64,
    /// Timeout in milliseconds before an idle connection is closed
    idle_timeout_ms: u64,
    /// Maximum lifetime of a connection in milliseconds before it's recycled
    max_lifetime_ms: Option<u64>,
}

impl PoolConfig {
    /// Create a pool configuration with the given min and max sizes.
    ///
    /// The idle cap starts equal to `max_size`.
    pub fn new(min_size: usize, max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(ProbeError::Configuration(
                "pool max_size must be greater than 0".to_string(),
            ));
        }
        if min_size > max_size {
            return Err(ProbeError::Configuration(format!(
                "pool min_size ({}) cannot exceed max_size ({})",
                min_size, max_size
            )));
        }

        Ok(Self {
            min_size,
            max_size,
            max_idle: max_size,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: None,
        })
    }

    /// Cap the number of idle connections. Values above `max_size` are
    /// clamped to it.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle.min(self.max_size);
        self
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout in milliseconds
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum connection lifetime in milliseconds
    pub fn with_max_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.max_lifetime_ms = Some(lifetime_ms);
        self
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }
}

impl Default for PoolConfig {
    /// 10 open, 5 idle, one hour lifetime
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: 10,
            max_idle: 5,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: Some(3_600_000),
        }
    }
}

//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool's state and lifetime counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Configured cap on open connections
    pub(super) max_open: usize,
    /// Open connections (idle + active)
    pub(super) total: usize,
    pub(super) idle: usize,
    /// Connections currently borrowed
    pub(super) active: usize,
    /// Callers currently waiting for a connection
    pub(super) waiting: usize,
    /// Connections opened over the pool's lifetime
    pub(super) created: u64,
    /// Closed on return because the idle cap was reached
    pub(super) max_idle_closed: u64,
    /// Closed because they outlived the maximum lifetime
    pub(super) max_lifetime_closed: u64,
    /// Closed because they sat idle too long
    pub(super) idle_timeout_closed: u64,
}

impl PoolStats {
    pub fn max_open(&self) -> usize {
        self.max_open
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn max_idle_closed(&self) -> u64 {
        self.max_idle_closed
    }

    pub fn max_lifetime_closed(&self) -> u64 {
        self.max_lifetime_closed
    }

    pub fn idle_timeout_closed(&self) -> u64 {
        self.idle_timeout_closed
    }
}

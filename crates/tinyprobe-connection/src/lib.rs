//! tinyprobe connection - pooling and health checks
//!
//! Both layers sit on top of the `Connection` trait, so they work the same
//! against the MySQL driver and against in-memory test doubles.

pub mod health;
pub mod pool;

pub use health::{HealthStatus, HealthThresholds, PingError, PingResult, ping_database};
pub use pool::{
    ConnectionFactory, ConnectionPool, DriverConnectionFactory, PoolConfig, PoolStats,
    PooledConnection,
};

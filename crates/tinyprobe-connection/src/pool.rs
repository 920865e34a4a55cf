//! Connection pooling for database connections
//!
//! A pool caps open connections and keeps up to `max_idle` of them for
//! reuse. Connections older than the optional maximum lifetime are recycled.
//!
//! # Example
//!
//! ```ignore
//! use tinyprobe_connection::pool::{ConnectionPool, DriverConnectionFactory, PoolConfig};
//!
//! let config = PoolConfig::new(0, 10)?
//!     .with_max_idle(5)
//!     .with_max_lifetime_ms(3_600_000);
//!
//! let pool = ConnectionPool::new(config, DriverConnectionFactory::new(driver, conn_config));
//! let conn = pool.get().await?;
//! // Connection returned to pool on drop
//! ```

mod config;
mod factory;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use factory::{ConnectionFactory, DriverConnectionFactory};
pub use pool::{ConnectionPool, PooledConnection};
pub use stats::PoolStats;

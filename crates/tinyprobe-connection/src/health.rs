//! Health checks for database connections
//!
//! A ping is the cheapest round trip a connection can make. Its latency is
//! classified against [`HealthThresholds`].
//!
//! # Example
//!
//! ```ignore
//! use tinyprobe_connection::health::{ping_database, HealthStatus, HealthThresholds};
//!
//! let latency = ping_database(&*connection, Some(Duration::from_secs(5))).await?;
//! let status = HealthStatus::from_latency_with_thresholds(latency, &HealthThresholds::default());
//! ```

mod ping;
mod status;

#[cfg(test)]
mod tests;

pub use ping::{PingError, PingResult, ping_database};
pub use status::{HealthStatus, HealthThresholds};

//! Database ping
//!
//! Uses the connection's own ping, which for MySQL is `COM_PING` rather than
//! a query, and measures the round trip.

use std::time::{Duration, Instant};

use tinyprobe_core::Connection;

/// Result of a ping operation
pub type PingResult = Result<Duration, PingError>;

/// Why a ping did not come back
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PingError {
    #[error("Connection is closed")]
    ConnectionClosed,
    #[error("Ping failed: {0}")]
    Failed(String),
    #[error("Ping timed out after {0:?}")]
    Timeout(Duration),
}

/// Ping `conn` and return the round-trip time.
///
/// Without a `timeout` the ping may wait as long as the driver does.
pub async fn ping_database(conn: &dyn Connection, timeout: Option<Duration>) -> PingResult {
    if conn.is_closed() {
        return Err(PingError::ConnectionClosed);
    }

    let start = Instant::now();
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, conn.ping())
            .await
            .map_err(|_| PingError::Timeout(limit))?,
        None => conn.ping().await,
    };

    match outcome {
        Ok(()) => Ok(start.elapsed()),
        Err(e) => Err(PingError::Failed(e.to_string())),
    }
}

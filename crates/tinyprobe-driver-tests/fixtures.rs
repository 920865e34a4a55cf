//! Shared fixtures: where the test server is and how to reach it.
//!
//! Tests normally run against the MySQL container from
//! [`test_containers`](crate::test_containers). Setting
//! `TINYPROBE_TEST_SERVER=host:port` points them at a running server instead,
//! which must already have the `root`, `test` and `admin` accounts.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tinyprobe_core::{Connection, ConnectionConfig, DatabaseDriver};
use tinyprobe_driver_mysql::MySqlDriver;

use crate::test_containers::{ContainerInfo, mysql_container};

/// Environment variable naming an already running server
pub const TEST_SERVER_ENV: &str = "TINYPROBE_TEST_SERVER";

/// Whether the tests should use an external server rather than Docker
pub fn use_external_server() -> bool {
    env::var(TEST_SERVER_ENV).is_ok_and(|v| !v.trim().is_empty())
}

/// Location of the server under test
pub async fn test_server() -> Result<ContainerInfo> {
    initialize_logging();

    if use_external_server() {
        let target = env::var(TEST_SERVER_ENV)?;
        let config = MySqlDriver::new()
            .parse_connection_string(&target)
            .with_context(|| format!("invalid {TEST_SERVER_ENV}: {target}"))?;
        return Ok(ContainerInfo {
            host: config.host,
            port: config.port,
            database: config.database.unwrap_or_else(|| "test".to_string()),
        });
    }

    mysql_container().await
}

/// Configuration for `user` on the server under test
pub async fn config_for(user: &str, password: &str) -> Result<ConnectionConfig> {
    Ok(test_server().await?.config_for(user, password))
}

/// A fresh connection as `root`
pub async fn test_connection() -> Result<Arc<dyn Connection>> {
    let config = config_for("root", "").await?;
    wait_for_connection(&config, 5, Duration::from_secs(1)).await
}

/// Connect, retrying with linear backoff while the server warms up
async fn wait_for_connection(
    config: &ConnectionConfig,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<Arc<dyn Connection>> {
    let driver = MySqlDriver::new();
    let mut attempt = 1;
    loop {
        match driver.connect(config).await {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < max_attempts => {
                tracing::debug!(attempt, error = %e, "server not ready yet");
                tokio::time::sleep(base_delay * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("server at {} not ready after {max_attempts} attempts", config.target())
                });
            }
        }
    }
}

fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tinyprobe_driver_mysql=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_info_config() {
        let info = ContainerInfo {
            host: "127.0.0.1".to_string(),
            port: 32768,
            database: "test".to_string(),
        };
        let config = info.config_for("admin", "admin123");
        assert_eq!(config.target(), "127.0.0.1:32768/test");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("admin123"));
    }
}

//! Docker container management for integration tests.
//!
//! The MySQL container is started lazily by the first test that asks for it
//! and reused for the rest of the run. On start it is given the accounts a
//! Tiny-SQL server has, so the probes can run against it unchanged.
//!
//! ```rust,ignore
//! use tinyprobe_driver_tests::test_containers::mysql_container;
//!
//! let info = mysql_container().await?;
//! let config = info.config_for("test", "test");
//! ```

use std::time::Duration;

use anyhow::Context;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;
use tinyprobe_core::{Connection, ConnectionConfig, DatabaseDriver};
use tinyprobe_driver_mysql::MySqlDriver;
use tokio::sync::OnceCell;

/// Accounts created on the container, matching a stock Tiny-SQL server
pub const ACCOUNTS: [(&str, &str); 3] = [("root", ""), ("test", "test"), ("admin", "admin123")];

/// Where a test server is listening
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    /// Database name
    pub database: String,
}

impl ContainerInfo {
    /// Configuration for one of the server's accounts
    pub fn config_for(&self, user: &str, password: &str) -> ConnectionConfig {
        ConnectionConfig::new_mysql(&self.host, self.port, &self.database, user)
            .with_credentials(user, password)
    }
}

/// MySQL container with the Tiny-SQL accounts
struct MysqlContainer {
    #[allow(dead_code)]
    inner: ContainerAsync<Mysql>,
    info: ContainerInfo,
}

static MYSQL_CONTAINER: OnceCell<MysqlContainer> = OnceCell::const_new();

/// Get or start the MySQL test container
///
/// testcontainers-modules' MySQL image has `root` with an empty password
/// and a `test` database. The other accounts are added here.
pub async fn mysql_container() -> anyhow::Result<ContainerInfo> {
    let container = MYSQL_CONTAINER.get_or_try_init(start_mysql).await?;
    Ok(container.info.clone())
}

async fn start_mysql() -> anyhow::Result<MysqlContainer> {
    tracing::info!("starting MySQL test container");

    let inner = Mysql::default()
        .start()
        .await
        .context("failed to start mysql container")?;
    let port = inner
        .get_host_port_ipv4(3306)
        .await
        .context("failed to get mysql port")?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "test".to_string(),
    };
    tracing::info!(port, "MySQL test container started, creating accounts");

    create_accounts(&info).await?;

    Ok(MysqlContainer { inner, info })
}

/// Connect as root, retrying with backoff while the server finishes booting
async fn connect_root(info: &ContainerInfo) -> anyhow::Result<std::sync::Arc<dyn Connection>> {
    let driver = MySqlDriver::new();
    let config = info.config_for("root", "");
    let max_retries = 10;

    let mut attempt = 1;
    loop {
        match driver.connect(&config).await {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < max_retries => {
                let delay = Duration::from_secs(2u64.pow(attempt.min(4)));
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    "MySQL connection failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to connect to MySQL after {} attempts: {}",
                    max_retries,
                    e
                ));
            }
        }
    }
}

async fn create_accounts(info: &ContainerInfo) -> anyhow::Result<()> {
    let conn = connect_root(info).await?;

    for (user, password) in ACCOUNTS.iter().filter(|(user, _)| *user != "root") {
        let statements = [
            format!(
                "CREATE USER IF NOT EXISTS '{user}'@'%' IDENTIFIED WITH mysql_native_password BY '{password}'"
            ),
            format!("GRANT ALL PRIVILEGES ON *.* TO '{user}'@'%'"),
        ];
        for sql in &statements {
            conn.execute(sql, &[])
                .await
                .with_context(|| format!("failed to run: {sql}"))?;
        }
    }
    conn.execute("FLUSH PRIVILEGES", &[])
        .await
        .context("failed to flush privileges")?;
    conn.close().await?;

    tracing::info!("MySQL test accounts created");
    Ok(())
}

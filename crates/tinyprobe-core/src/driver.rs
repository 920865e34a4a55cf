//! Database driver trait definition

use crate::{Connection, ConnectionProperties, Result, TlsConfig};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on how long a connection attempt may take
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capabilities that a driver may support
#[derive(Debug, Clone, Default)]
pub struct DriverCapabilities {
    /// Supports server-side prepared statements (`COM_STMT_PREPARE`)
    pub supports_server_prepared_statements: bool,
    /// Emulates prepared statements by substituting literals on the client
    pub supports_client_prepared_statements: bool,
}

impl DriverCapabilities {
    /// How `prepare` is carried out, for display
    pub fn prepared_statements(&self) -> &'static str {
        if self.supports_server_prepared_statements {
            "server-side"
        } else if self.supports_client_prepared_statements {
            "client-side"
        } else {
            "unsupported"
        }
    }
}

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Driver name
    fn name(&self) -> &'static str;

    /// Display name for output
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Driver version
    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Supported features/capabilities
    fn capabilities(&self) -> DriverCapabilities;

    /// Port used when a target does not name one
    fn default_port(&self) -> u16;

    /// Accepted connection string forms, shown when parsing fails
    fn connection_string_help(&self) -> &'static str {
        ""
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Parse a connection string into a configuration
    fn parse_connection_string(&self, _conn_str: &str) -> Result<ConnectionConfig> {
        Err(crate::ProbeError::NotSupported(
            "Connection string parsing not implemented for this driver".into(),
        ))
    }

    /// Build a connection string from configuration
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Display name
    pub name: String,
    /// Driver ID (e.g., "mysql")
    pub driver: String,
    /// Host address
    pub host: String,
    /// Port number (0 for the driver default)
    pub port: u16,
    /// Database name
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// TLS settings
    pub tls: TlsConfig,
    /// Upper bound on connection establishment
    pub connect_timeout: Duration,
    /// Additional connection parameters
    pub params: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            driver: driver.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            tls: TlsConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            params: BTreeMap::new(),
        }
    }

    /// Create a MySQL configuration
    pub fn new_mysql(host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new("mysql", "MySQL");
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string()).filter(|db| !db.is_empty());
        config.username = Some(username.to_string());
        config
    }

    /// Replace the credentials, keeping everything else
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Apply a property bag on top of this configuration
    pub fn with_properties(mut self, properties: &ConnectionProperties) -> Result<Self> {
        properties.apply_to(&mut self)?;
        Ok(self)
    }

    /// `host:port/database`, the shape the probes print
    pub fn target(&self) -> String {
        let mut target = format!("{}:{}", self.host, self.port);
        if let Some(db) = &self.database {
            target.push('/');
            target.push_str(db);
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_mysql_config() {
        let config = ConnectionConfig::new_mysql("localhost", 3307, "test", "root");
        assert_eq!(config.driver, "mysql");
        assert_eq!(config.target(), "localhost:3307/test");
        assert_eq!(config.username.as_deref(), Some("root"));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_empty_database_means_none() {
        let config = ConnectionConfig::new_mysql("db", 3306, "", "root");
        assert!(config.database.is_none());
        assert_eq!(config.target(), "db:3306");
    }

    #[test]
    fn test_with_credentials_keeps_target() {
        let config = ConnectionConfig::new_mysql("localhost", 3307, "test", "root")
            .with_credentials("admin", "admin123");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("admin123"));
        assert_eq!(config.target(), "localhost:3307/test");
    }
}

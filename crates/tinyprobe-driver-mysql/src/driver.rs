//! MySQL driver implementation

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::sync::Arc;
use tinyprobe_core::{
    Connection, ConnectionConfig, ConnectionProperties, DatabaseDriver, DriverCapabilities,
    ProbeError, Result, TlsMode,
};
use url::Url;

use crate::{MySqlConnection, build_ssl_params};

/// Port Tiny-SQL listens on unless told otherwise
pub const TINY_SQL_DEFAULT_PORT: u16 = 3307;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn display_name(&self) -> &'static str {
        "tinyprobe MySQL driver (mysql_async)"
    }

    fn default_port(&self) -> u16 {
        TINY_SQL_DEFAULT_PORT
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_server_prepared_statements: false,
            supports_client_prepared_statements: true,
        }
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, port = config.port, database = config.database.as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = MySqlConnection::connect(config).await?;
        Ok(Arc::new(conn))
    }

    /// Accepts `host[:port][/database]`,
    /// `mysql://[user[:password]@]host[:port][/database][?props]` and
    /// `jdbc:mysql://host[:port][/database][?props]`.
    fn parse_connection_string(&self, conn_str: &str) -> Result<ConnectionConfig> {
        let trimmed = conn_str.trim();
        if trimmed.is_empty() {
            return Err(ProbeError::Configuration(
                "connection string is empty".to_string(),
            ));
        }

        let without_jdbc = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
        if without_jdbc.contains("://") {
            parse_url(without_jdbc)
        } else {
            parse_bare_target(trimmed)
        }
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let host = if config.host.is_empty() {
            "localhost"
        } else {
            config.host.as_str()
        };
        let port = if config.port > 0 {
            config.port
        } else {
            TINY_SQL_DEFAULT_PORT
        };

        let mut conn_str = String::from("mysql://");
        if let Some(user) = &config.username {
            conn_str.push_str(&utf8_percent_encode(user, NON_ALPHANUMERIC).to_string());
            if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
                conn_str.push(':');
                conn_str.push_str(&utf8_percent_encode(password, NON_ALPHANUMERIC).to_string());
            }
            conn_str.push('@');
        }

        if host.contains(':') {
            conn_str.push_str(&format!("[{}]:{}", host, port));
        } else {
            conn_str.push_str(&format!("{}:{}", host, port));
        }

        if let Some(db) = &config.database {
            conn_str.push('/');
            conn_str.push_str(&utf8_percent_encode(db, NON_ALPHANUMERIC).to_string());
        }

        if config.tls.mode != TlsMode::Disable {
            conn_str.push('?');
            conn_str.push_str(&build_ssl_params(&config.tls));
        }

        conn_str
    }

    fn connection_string_help(&self) -> &'static str {
        "host:port/database | mysql://[user[:password]@]host[:port][/database] | jdbc:mysql://host[:port][/database][?key=value&...]"
    }
}

fn parse_url(conn_str: &str) -> Result<ConnectionConfig> {
    let url = Url::parse(conn_str).map_err(|e| {
        ProbeError::Configuration(format!("invalid connection URL '{}': {}", conn_str, e))
    })?;
    if url.scheme() != "mysql" {
        return Err(ProbeError::Configuration(format!(
            "unsupported URL scheme '{}', expected mysql",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ProbeError::Configuration(format!("no host in '{}'", conn_str)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let mut config = ConnectionConfig::new("mysql", "MySQL");
    config.host = host.to_string();
    config.port = url.port().unwrap_or(TINY_SQL_DEFAULT_PORT);

    if !url.username().is_empty() {
        config.username = Some(decode(url.username())?);
        config.password = Some(url.password().map(decode).transpose()?.unwrap_or_default());
    }

    let database = decode(url.path().trim_start_matches('/'))?;
    config.database = Some(database).filter(|db| !db.is_empty());

    match url.query() {
        Some(query) => config.with_properties(&ConnectionProperties::parse_query(query)?),
        None => Ok(config),
    }
}

fn parse_bare_target(target: &str) -> Result<ConnectionConfig> {
    let (authority, database) = match target.split_once('/') {
        Some((authority, db)) => (authority, Some(db)),
        None => (target, None),
    };

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        // [::1]:3307
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            ProbeError::Configuration(format!("unterminated IPv6 address in '{}'", target))
        })?;
        (host, tail.strip_prefix(':'))
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(ProbeError::Configuration(format!("no host in '{}'", target)));
    }

    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| {
            ProbeError::Configuration(format!("invalid port '{}' in '{}'", p, target))
        })?,
        None => TINY_SQL_DEFAULT_PORT,
    };

    let mut config = ConnectionConfig::new("mysql", "MySQL");
    config.host = host.to_string();
    config.port = port;
    config.database = database
        .map(|db| db.trim_end_matches('/').to_string())
        .filter(|db| !db.is_empty());
    Ok(config)
}

fn decode(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|e| ProbeError::Configuration(format!("invalid percent-encoding: {}", e)))
}

#[cfg(test)]
mod tests;

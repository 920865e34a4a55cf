//! Settings file and target resolution
//!
//! The settings file lives at `<config dir>/tinyprobe/config.toml`:
//!
//! ```toml
//! [target]
//! host = "db.internal"
//! port = 3307
//! database = "test"
//!
//! [properties]
//! serverTimezone = "+02:00"
//!
//! [[users]]
//! user = "test"
//! password = "test"
//!
//! [pool]
//! max_open = 10
//! workers = 5
//! ```
//!
//! Values resolve command line first, then environment (both through clap),
//! then this file, then the built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tinyprobe_core::{ConnectionConfig, DatabaseDriver, ProbeError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_DATABASE: &str = "test";
pub const DEFAULT_USER: &str = "root";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("tinyprobe"))
}

pub fn settings_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Where to connect. Every field is optional so the same shape works for a
/// settings-file layer and a command-line layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSettings {
    /// Full connection URL, applied before the individual fields
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCredentials {
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl UserCredentials {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

/// Accounts tried by the users probe when the settings file lists none
pub fn default_users() -> Vec<UserCredentials> {
    vec![
        UserCredentials::new("root", ""),
        UserCredentials::new("test", "test"),
        UserCredentials::new("admin", "admin123"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub max_open: usize,
    pub max_idle: usize,
    pub max_lifetime_secs: u64,
    /// Idle connections older than this are closed instead of reused
    pub max_idle_time_secs: u64,
    /// Concurrent `SELECT 1` workers run by the pool probe
    pub workers: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 5,
            max_lifetime_secs: 3600,
            max_idle_time_secs: 600,
            workers: 5,
        }
    }
}

/// Latency bounds for the ping probe, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSettings {
    pub healthy_ms: u64,
    pub degraded_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            healthy_ms: 100,
            degraded_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub target: TargetSettings,
    /// Extra connection properties layered over the properties probe's bag
    pub properties: BTreeMap<String, String>,
    pub users: Vec<UserCredentials>,
    pub pool: PoolSettings,
    pub health: HealthSettings,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one the default location is
    /// used, and a missing file there yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let path = match settings_file() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(error = %e, "no config directory, using default settings");
                return Ok(Self::default());
            }
        };

        if path.exists() {
            Self::from_file(&path)
        } else {
            tracing::debug!(path = %path.display(), "settings file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn users(&self) -> Vec<UserCredentials> {
        if self.users.is_empty() {
            default_users()
        } else {
            self.users.clone()
        }
    }
}

/// Build the base connection configuration from the built-in defaults and
/// the given layers, lowest precedence first.
///
/// Within a layer the URL is applied before the individual fields, so
/// `--url mysql://db/test --port 3310` connects to port 3310.
pub fn resolve_target(
    driver: &dyn DatabaseDriver,
    layers: &[&TargetSettings],
) -> tinyprobe_core::Result<ConnectionConfig> {
    let mut config =
        ConnectionConfig::new_mysql(DEFAULT_HOST, driver.default_port(), DEFAULT_DATABASE, DEFAULT_USER)
            .with_credentials(DEFAULT_USER, "");

    for layer in layers {
        if let Some(url) = &layer.url {
            let parsed = driver.parse_connection_string(url).map_err(|e| match e {
                ProbeError::Configuration(msg) => ProbeError::Configuration(format!(
                    "{msg}; accepted forms: {}",
                    driver.connection_string_help()
                )),
                other => other,
            })?;
            merge_parsed(&mut config, parsed);
        }
        if let Some(host) = &layer.host {
            if host.is_empty() {
                return Err(ProbeError::Configuration("host must not be empty".into()));
            }
            config.host = host.clone();
        }
        if let Some(port) = layer.port {
            if port == 0 {
                return Err(ProbeError::Configuration("port must not be 0".into()));
            }
            config.port = port;
        }
        if let Some(database) = &layer.database {
            config.database = Some(database.clone()).filter(|db| !db.is_empty());
        }
        if let Some(user) = &layer.user {
            config.username = Some(user.clone());
        }
        if let Some(password) = &layer.password {
            config.password = Some(password.clone());
        }
        if let Some(ms) = layer.connect_timeout_ms {
            if ms == 0 {
                return Err(ProbeError::Configuration(
                    "connect timeout must be greater than 0".into(),
                ));
            }
            config.connect_timeout = Duration::from_millis(ms);
        }
    }

    Ok(config)
}

fn merge_parsed(config: &mut ConnectionConfig, parsed: ConnectionConfig) {
    config.host = parsed.host;
    if parsed.port != 0 {
        config.port = parsed.port;
    }
    if parsed.database.is_some() {
        config.database = parsed.database;
    }
    if parsed.username.is_some() {
        config.username = parsed.username;
        config.password = Some(parsed.password.unwrap_or_default());
    }
    if parsed.connect_timeout != tinyprobe_core::DEFAULT_CONNECT_TIMEOUT {
        config.connect_timeout = parsed.connect_timeout;
    }
    config.tls = parsed.tls;
    config.params.extend(parsed.params);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tinyprobe_core::TlsMode;
    use tinyprobe_driver_mysql::MySqlDriver;

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_settings_file_roundtrip() {
        let file = write_settings(
            r#"
[target]
host = "db.internal"
port = 3310
connect_timeout_ms = 2500

[properties]
serverTimezone = "+02:00"

[[users]]
user = "probe"
password = "secret"

[[users]]
user = "anonymous"

[pool]
max_open = 4
max_idle_time_secs = 30
workers = 8
"#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.target.host.as_deref(), Some("db.internal"));
        assert_eq!(settings.target.port, Some(3310));
        assert_eq!(settings.target.connect_timeout_ms, Some(2500));
        assert_eq!(
            settings.properties.get("serverTimezone").map(String::as_str),
            Some("+02:00")
        );
        assert_eq!(
            settings.users(),
            vec![
                UserCredentials::new("probe", "secret"),
                UserCredentials::new("anonymous", ""),
            ]
        );
        assert_eq!(settings.pool.max_open, 4);
        assert_eq!(settings.pool.max_idle_time_secs, 30);
        assert_eq!(settings.pool.max_idle, 5);
        assert_eq!(settings.pool.workers, 8);
        assert_eq!(settings.health, HealthSettings::default());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = write_settings("");
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.users(), default_users());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = write_settings("[target]\nhots = \"typo\"\n");
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = resolve_target(&MySqlDriver::new(), &[]).unwrap();
        assert_eq!(config.target(), "localhost:3307/test");
        assert_eq!(config.username.as_deref(), Some("root"));
        assert_eq!(config.password.as_deref(), Some(""));
    }

    #[test]
    fn test_later_layers_win() {
        let file = TargetSettings {
            host: Some("from-file".into()),
            port: Some(3310),
            user: Some("test".into()),
            password: Some("test".into()),
            ..Default::default()
        };
        let cli = TargetSettings {
            host: Some("from-cli".into()),
            ..Default::default()
        };

        let config = resolve_target(&MySqlDriver::new(), &[&file, &cli]).unwrap();
        assert_eq!(config.target(), "from-cli:3310/test");
        assert_eq!(config.username.as_deref(), Some("test"));
    }

    #[test]
    fn test_fields_override_url_in_same_layer() {
        let cli = TargetSettings {
            url: Some("mysql://admin:admin123@db:3311/prod?sslMode=REQUIRED".into()),
            port: Some(3312),
            ..Default::default()
        };

        let config = resolve_target(&MySqlDriver::new(), &[&cli]).unwrap();
        assert_eq!(config.target(), "db:3312/prod");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("admin123"));
        assert_eq!(config.tls.mode, TlsMode::Require);
    }

    #[test]
    fn test_url_without_user_keeps_default_credentials() {
        let cli = TargetSettings {
            url: Some("otherhost:3307/test".into()),
            ..Default::default()
        };
        let config = resolve_target(&MySqlDriver::new(), &[&cli]).unwrap();
        assert_eq!(config.host, "otherhost");
        assert_eq!(config.username.as_deref(), Some("root"));
    }

    #[test]
    fn test_bad_url_error_lists_accepted_forms() {
        let layer = TargetSettings {
            url: Some("postgres://db/test".into()),
            ..Default::default()
        };
        let err = resolve_target(&MySqlDriver::new(), &[&layer]).unwrap_err();
        assert!(err.to_string().contains("accepted forms: host:port/database"), "{err}");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for layer in [
            TargetSettings {
                port: Some(0),
                ..Default::default()
            },
            TargetSettings {
                connect_timeout_ms: Some(0),
                ..Default::default()
            },
            TargetSettings {
                url: Some("postgres://db/test".into()),
                ..Default::default()
            },
        ] {
            let err = resolve_target(&MySqlDriver::new(), &[&layer]).unwrap_err();
            assert_eq!(err.kind(), "configuration", "{layer:?}");
        }
    }
}

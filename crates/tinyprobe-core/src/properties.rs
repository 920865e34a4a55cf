//! Connection property bags keyed by camelCase driver property names
//!
//! A property bag is a flat string map (`useSSL=false`,
//! `serverTimezone=UTC`, ...) that is folded into a [`ConnectionConfig`].
//! Keys are matched case-insensitively. Unknown keys are kept as plain
//! connection parameters.

use crate::{ConnectionConfig, ProbeError, Result, TlsConfig, TlsMode};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Parameter key under which the normalized time zone is stored
pub const PARAM_SERVER_TIMEZONE: &str = "serverTimezone";
/// Parameter key under which the normalized character encoding is stored
pub const PARAM_CHARACTER_ENCODING: &str = "characterEncoding";
/// Parameter key for the client-side read-only flag
pub const PARAM_READ_ONLY: &str = "readOnly";

/// An ordered bag of connection properties
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionProperties {
    entries: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.redacted()).finish()
    }
}

impl ConnectionProperties {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value for the same key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        if let Some(existing) = self.find_key(&key) {
            self.entries.remove(&existing);
        }
        self.entries.insert(key, value.into());
        self
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a property, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find_key(key)
            .and_then(|k| self.entries.get(&k))
            .map(String::as_str)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Properties with the password value masked, for printing
    pub fn redacted(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries.iter().map(|(k, v)| {
            let shown = if k.eq_ignore_ascii_case("password") {
                "*".repeat(v.len().min(8))
            } else {
                v.clone()
            };
            (k.as_str(), shown)
        })
    }

    /// Parse `key=value&key=value` (a URL query string)
    pub fn parse_query(query: &str) -> Result<Self> {
        let mut properties = Self::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(key)?;
            if key.is_empty() {
                return Err(ProbeError::Configuration(format!(
                    "connection property without a name in '{}'",
                    query
                )));
            }
            properties.set(key, decode(value)?);
        }
        Ok(properties)
    }

    /// Fold the properties into `config`.
    ///
    /// TLS keys apply as `useSSL`, then `requireSSL`, then `sslMode`, so an
    /// explicit `sslMode` always has the last word. The remaining keys follow
    /// in normalized name order. Key spelling never changes the outcome.
    pub fn apply_to(&self, config: &mut ConnectionConfig) -> Result<()> {
        let mut ordered: Vec<_> = self
            .entries
            .iter()
            .map(|(key, value)| (normalize_key(key), key, value))
            .collect();
        ordered.sort_by(|(a, a_key, _), (b, b_key, _)| {
            (apply_rank(a), a, a_key).cmp(&(apply_rank(b), b, b_key))
        });

        for (normalized, key, value) in ordered {
            match normalized.as_str() {
                "user" => config.username = Some(value.clone()),
                "password" => config.password = Some(value.clone()),
                "databasename" | "dbname" => {
                    config.database = Some(value.clone()).filter(|db| !db.is_empty())
                }
                "usessl" => {
                    if !parse_bool(key, value)? {
                        config.tls = TlsConfig::disabled();
                    } else if config.tls.mode == TlsMode::Disable {
                        config.tls.mode = TlsMode::Prefer;
                    }
                }
                "requiressl" => {
                    if parse_bool(key, value)? {
                        config.tls.mode = TlsMode::Require;
                    }
                }
                "sslmode" => {
                    let mode: TlsMode = value.parse()?;
                    config.tls.mode = mode;
                    config.tls.verify_server = mode.requires_ca_verification();
                }
                "sslca" => config.tls.ca_cert = Some(PathBuf::from(value)),
                "sslcert" => config.tls.client_cert = Some(PathBuf::from(value)),
                "sslkey" => config.tls.client_key = Some(PathBuf::from(value)),
                "servertimezone" => {
                    let tz = normalize_time_zone(value)?;
                    config.params.insert(PARAM_SERVER_TIMEZONE.to_string(), tz);
                }
                "characterencoding" => {
                    let encoding = normalize_encoding(value)?;
                    config
                        .params
                        .insert(PARAM_CHARACTER_ENCODING.to_string(), encoding.to_string());
                }
                "connecttimeout" => {
                    let ms: u64 = value.trim().parse().map_err(|_| {
                        ProbeError::Configuration(format!(
                            "{} must be a number of milliseconds, got '{}'",
                            key, value
                        ))
                    })?;
                    if ms == 0 {
                        return Err(ProbeError::Configuration(format!(
                            "{} must be greater than zero",
                            key
                        )));
                    }
                    config.connect_timeout = Duration::from_millis(ms);
                }
                "readonly" => {
                    let read_only = parse_bool(key, value)?;
                    config
                        .params
                        .insert(PARAM_READ_ONLY.to_string(), read_only.to_string());
                }
                _ => {
                    tracing::warn!(property = %key, "unrecognized connection property, passing through");
                    config.params.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn find_key(&self, key: &str) -> Option<String> {
        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned()
    }
}

fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase().replace(['-', '_'], "")
}

fn apply_rank(normalized: &str) -> u8 {
    match normalized {
        "usessl" => 0,
        "requiressl" => 1,
        "sslmode" => 2,
        _ => 3,
    }
}

fn decode(s: &str) -> Result<String> {
    let plus_as_space = s.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_as_space)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|e| ProbeError::Configuration(format!("invalid percent-encoding: {}", e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ProbeError::Configuration(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}

/// Accepts `UTC`/`GMT`, fixed offsets such as `+08:00`, and region names
/// such as `Asia/Shanghai`. Offsets are normalized to `+HH:MM`.
fn normalize_time_zone(value: &str) -> Result<String> {
    let tz = value.trim();
    if tz.is_empty() {
        return Err(ProbeError::Configuration(
            "serverTimezone cannot be empty".to_string(),
        ));
    }
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("gmt") || tz == "Z" {
        return Ok("UTC".to_string());
    }
    if let Some(rest) = tz.strip_prefix('+').or_else(|| tz.strip_prefix('-')) {
        let sign = &tz[..1];
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "00"));
        let hours: u8 = hours.parse().map_err(|_| bad_zone(tz))?;
        let minutes: u8 = minutes.parse().map_err(|_| bad_zone(tz))?;
        if hours > 14 || minutes > 59 {
            return Err(bad_zone(tz));
        }
        return Ok(format!("{}{:02}:{:02}", sign, hours, minutes));
    }
    let valid_region = tz
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'));
    if valid_region {
        Ok(tz.to_string())
    } else {
        Err(bad_zone(tz))
    }
}

fn bad_zone(tz: &str) -> ProbeError {
    ProbeError::Configuration(format!("invalid serverTimezone '{}'", tz))
}

/// Map common charset spellings such as `UTF-8` onto MySQL charset names
fn normalize_encoding(value: &str) -> Result<&'static str> {
    match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "utf8" | "utf-8" | "utf8mb3" => Ok("utf8"),
        "utf8mb4" => Ok("utf8mb4"),
        "latin1" | "iso-8859-1" | "iso8859-1" | "cp1252" => Ok("latin1"),
        "ascii" | "us-ascii" => Ok("ascii"),
        "binary" => Ok("binary"),
        _ => Err(ProbeError::Configuration(format!(
            "unsupported characterEncoding '{}'",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> ConnectionConfig {
        ConnectionConfig::new_mysql("localhost", 3307, "test", "nobody")
    }

    #[test]
    fn test_standard_property_bag() {
        let props = ConnectionProperties::new()
            .with("user", "root")
            .with("password", "")
            .with("useSSL", "false")
            .with("serverTimezone", "UTC")
            .with("characterEncoding", "utf8");

        let config = base().with_properties(&props).unwrap();
        assert_eq!(config.username.as_deref(), Some("root"));
        assert_eq!(config.password.as_deref(), Some(""));
        assert_eq!(config.tls.mode, TlsMode::Disable);
        assert_eq!(
            config.params.get(PARAM_SERVER_TIMEZONE).map(String::as_str),
            Some("UTC")
        );
        assert_eq!(
            config.params.get(PARAM_CHARACTER_ENCODING).map(String::as_str),
            Some("utf8")
        );
    }

    #[test]
    fn test_keys_are_case_insensitive_and_replace() {
        let mut props = ConnectionProperties::new();
        props.set("useSSL", "true");
        props.set("usessl", "false");
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("USESSL"), Some("false"));
    }

    #[test]
    fn test_use_ssl_true_prefers_tls() {
        let props = ConnectionProperties::new().with("useSSL", "yes");
        let config = base().with_properties(&props).unwrap();
        assert_eq!(config.tls.mode, TlsMode::Prefer);
    }

    #[test]
    fn test_ssl_mode_wins_whatever_the_key_spelling() {
        for use_ssl in ["useSSL", "UseSSL", "USE_SSL", "use-ssl"] {
            for ssl_mode in ["sslMode", "SSLMODE", "ssl_mode"] {
                let props = ConnectionProperties::new()
                    .with(use_ssl, "true")
                    .with(ssl_mode, "DISABLED");
                let config = base().with_properties(&props).unwrap();
                assert_eq!(config.tls.mode, TlsMode::Disable, "{use_ssl} + {ssl_mode}");
            }
        }
    }

    #[test]
    fn test_require_ssl_applies_after_use_ssl() {
        for require_ssl in ["requireSSL", "RequireSsl"] {
            let props = ConnectionProperties::new()
                .with(require_ssl, "true")
                .with("useSSL", "true");
            let config = base().with_properties(&props).unwrap();
            assert_eq!(config.tls.mode, TlsMode::Require, "{require_ssl}");
        }
    }

    #[test]
    fn test_ssl_mode_overrides() {
        let props = ConnectionProperties::new().with("sslMode", "REQUIRED");
        let config = base().with_properties(&props).unwrap();
        assert_eq!(config.tls.mode, TlsMode::Require);
    }

    #[test]
    fn test_dashed_ssl_keys() {
        let props = ConnectionProperties::new()
            .with("ssl-mode", "VERIFY_CA")
            .with("ssl-ca", "/etc/ssl/ca.pem");
        let config = base().with_properties(&props).unwrap();
        assert_eq!(config.tls.mode, TlsMode::VerifyCa);
        assert!(config.tls.verify_server);
        assert_eq!(config.tls.ca_cert, Some(PathBuf::from("/etc/ssl/ca.pem")));
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for (key, value) in [
            ("useSSL", "maybe"),
            ("serverTimezone", "+25:00"),
            ("serverTimezone", "Mars Base"),
            ("characterEncoding", "ebcdic"),
            ("connectTimeout", "soon"),
            ("connectTimeout", "0"),
        ] {
            let props = ConnectionProperties::new().with(key, value);
            let err = base().with_properties(&props).unwrap_err();
            assert_eq!(err.kind(), "configuration", "{}={}", key, value);
        }
    }

    #[test]
    fn test_time_zone_normalization() {
        assert_eq!(normalize_time_zone("gmt").unwrap(), "UTC");
        assert_eq!(normalize_time_zone("+8").unwrap(), "+08:00");
        assert_eq!(normalize_time_zone("-05:30").unwrap(), "-05:30");
        assert_eq!(normalize_time_zone("Asia/Shanghai").unwrap(), "Asia/Shanghai");
    }

    #[test]
    fn test_encoding_normalization() {
        assert_eq!(normalize_encoding("UTF-8").unwrap(), "utf8");
        assert_eq!(normalize_encoding("utf8mb4").unwrap(), "utf8mb4");
        assert_eq!(normalize_encoding("ISO_8859_1").unwrap(), "latin1");
    }

    #[test]
    fn test_connect_timeout_and_unknown_keys() {
        let props = ConnectionProperties::new()
            .with("connectTimeout", "2500")
            .with("cachePrepStmts", "true");
        let config = base().with_properties(&props).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(
            config.params.get("cachePrepStmts").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_parse_query_decodes() {
        let props =
            ConnectionProperties::parse_query("user=te%40st&password=a+b&useSSL=false&flag")
                .unwrap();
        assert_eq!(props.get("user"), Some("te@st"));
        assert_eq!(props.get("password"), Some("a b"));
        assert_eq!(props.get("flag"), Some(""));
        assert!(ConnectionProperties::parse_query("=x").is_err());
    }

    #[test]
    fn test_debug_masks_password() {
        let props = ConnectionProperties::new()
            .with("user", "admin")
            .with("password", "admin123");
        let shown = format!("{:?}", props);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("admin123"));
    }
}

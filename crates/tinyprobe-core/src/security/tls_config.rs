//! TLS/SSL Configuration Types
//!
//! The modes mirror MySQL's `ssl-mode` values. `Allow`/`Prefer` try TLS and
//! fall back to a plain connection; the stricter modes never fall back.

use crate::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// TLS/SSL mode for database connections
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain TCP. Tiny-SQL does not offer TLS, so this is the default.
    #[default]
    Disable,
    /// Try TLS first, fall back to unencrypted if unavailable
    Allow,
    /// Prefer TLS, but allow unencrypted connections
    Prefer,
    /// Require TLS, but don't verify the server certificate
    Require,
    /// Require TLS and verify the server certificate against the CA
    VerifyCa,
    /// Require TLS, verify CA, and verify the server hostname matches
    VerifyFull,
}

impl TlsMode {
    /// Returns true if this mode requires certificate verification
    pub fn requires_ca_verification(&self) -> bool {
        matches!(self, TlsMode::VerifyCa | TlsMode::VerifyFull)
    }

    /// Returns true if a failed TLS negotiation may fall back to plain TCP
    pub fn allows_plaintext_fallback(&self) -> bool {
        matches!(self, TlsMode::Allow | TlsMode::Prefer)
    }
}

impl FromStr for TlsMode {
    type Err = ProbeError;

    /// Accepts both MySQL `ssl-mode` names (`VERIFY_IDENTITY`) and the
    /// snake-case names used in settings files (`verify_full`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "disable" | "disabled" => Ok(TlsMode::Disable),
            "allow" => Ok(TlsMode::Allow),
            "prefer" | "preferred" => Ok(TlsMode::Prefer),
            "require" | "required" => Ok(TlsMode::Require),
            "verify_ca" => Ok(TlsMode::VerifyCa),
            "verify_full" | "verify_identity" => Ok(TlsMode::VerifyFull),
            other => Err(ProbeError::Configuration(format!(
                "unknown TLS mode '{}'",
                other
            ))),
        }
    }
}

/// Configuration for TLS/SSL database connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    /// TLS mode determining the level of security
    pub mode: TlsMode,
    /// Path to the CA certificate file for server verification
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// Path to the client certificate file for mutual TLS
    #[serde(default)]
    pub client_cert: Option<PathBuf>,
    /// Path to the client private key file for mutual TLS
    #[serde(default)]
    pub client_key: Option<PathBuf>,
    /// Whether to verify the server's certificate (overrides mode for custom behavior)
    #[serde(default = "default_verify_server")]
    pub verify_server: bool,
}

fn default_verify_server() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::new(TlsMode::default())
    }
}

impl TlsConfig {
    /// Create a new TLS configuration with the specified mode
    pub fn new(mode: TlsMode) -> Self {
        Self {
            mode,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            verify_server: mode.requires_ca_verification(),
        }
    }

    /// Create a disabled TLS configuration
    pub fn disabled() -> Self {
        Self::new(TlsMode::Disable)
    }

    /// Create a TLS configuration that requires encryption
    pub fn require() -> Self {
        Self::new(TlsMode::Require)
    }

    /// Create a TLS configuration with full verification
    pub fn verify_full() -> Self {
        Self::new(TlsMode::VerifyFull)
    }

    /// Set the CA certificate path for server verification
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Set the client certificate for mutual TLS authentication
    pub fn client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert = Some(cert_path.into());
        self.client_key = Some(key_path.into());
        self
    }

    /// Override the server verification setting
    pub fn verify_server(mut self, verify: bool) -> Self {
        self.verify_server = verify;
        self
    }

    /// Validate the TLS configuration
    pub fn validate(&self) -> Result<()> {
        if self.mode.requires_ca_verification() && self.ca_cert.is_none() {
            return Err(ProbeError::Configuration(
                "TLS mode requires CA certificate but none provided".to_string(),
            ));
        }

        let paths = [
            (&self.ca_cert, "CA certificate"),
            (&self.client_cert, "Client certificate"),
            (&self.client_key, "Client key"),
        ];
        for (path, label) in paths {
            if let Some(path) = path
                && path.as_os_str().is_empty()
            {
                return Err(ProbeError::Configuration(format!(
                    "{} path cannot be empty",
                    label
                )));
            }
        }

        match (&self.client_cert, &self.client_key) {
            (Some(_), None) => Err(ProbeError::Configuration(
                "Client certificate provided but client key is missing".to_string(),
            )),
            (None, Some(_)) => Err(ProbeError::Configuration(
                "Client key provided but client certificate is missing".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

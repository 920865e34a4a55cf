//! TLS handshake planning for MySQL connections
//!
//! Tiny-SQL never offers TLS, so what matters is which handshakes a connect
//! makes. [`TlsPlan`] decides that up front: `Disable` goes straight to
//! plaintext, `Allow`/`Prefer` try TLS and may retry without it, and every
//! stricter mode stops at the failed TLS attempt.

use mysql_async::SslOpts;
use std::path::Path;
use tinyprobe_core::ProbeError;
use tinyprobe_core::security::{TlsConfig, TlsMode};
use tracing::{debug, warn};

/// Why a TLS configuration cannot be turned into SSL options
#[derive(Debug, thiserror::Error)]
pub enum MysqlTlsError {
    #[error("Invalid TLS configuration: {0}")]
    InvalidConfig(String),

    /// CA certificate file could not be used
    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },
}

impl From<MysqlTlsError> for ProbeError {
    fn from(err: MysqlTlsError) -> Self {
        ProbeError::Security(err.to_string())
    }
}

/// The handshakes one connect attempt is allowed to make
#[derive(Debug, Clone)]
pub struct TlsPlan {
    mode: TlsMode,
    encrypted: Option<SslOpts>,
}

impl TlsPlan {
    /// Plan the handshakes for `config`.
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate or the CA certificate
    /// file does not exist.
    pub fn for_config(config: &TlsConfig) -> Result<Self, MysqlTlsError> {
        config
            .validate()
            .map_err(|e| MysqlTlsError::InvalidConfig(e.to_string()))?;

        let encrypted = match config.mode {
            TlsMode::Disable => None,
            _ => Some(ssl_opts_for(config)?),
        };
        debug!(mode = ?config.mode, encrypted = encrypted.is_some(), "planned TLS handshake");

        Ok(Self {
            mode: config.mode,
            encrypted,
        })
    }

    /// SSL options for the first handshake, `None` for plaintext
    pub fn first_attempt(&self) -> Option<SslOpts> {
        self.encrypted.clone()
    }

    /// Whether a failed encrypted handshake should be retried in plaintext.
    ///
    /// Timeouts are never retried: the server did not answer at all.
    pub fn retry_in_plaintext(&self, error: &ProbeError) -> bool {
        self.encrypted.is_some()
            && self.mode.allows_plaintext_fallback()
            && !matches!(error, ProbeError::Timeout(_))
    }
}

fn ssl_opts_for(config: &TlsConfig) -> Result<SslOpts, MysqlTlsError> {
    let ssl_opts = match config.mode {
        TlsMode::VerifyFull => SslOpts::default(),
        TlsMode::VerifyCa => SslOpts::default().with_danger_skip_domain_validation(true),
        // REQUIRED encrypts without trusting the chain
        _ if config.verify_server => SslOpts::default().with_danger_accept_invalid_certs(true),
        _ => SslOpts::default()
            .with_danger_accept_invalid_certs(true)
            .with_danger_skip_domain_validation(true),
    };

    if config.client_cert.is_some() {
        warn!("client certificates are not presented on MySQL connections");
    }

    match &config.ca_cert {
        Some(path) => with_ca_cert(ssl_opts, path),
        None => Ok(ssl_opts),
    }
}

fn with_ca_cert(ssl_opts: SslOpts, path: &Path) -> Result<SslOpts, MysqlTlsError> {
    if !path.exists() {
        return Err(MysqlTlsError::CaCertLoadFailed {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    Ok(ssl_opts
        .with_root_certs(vec![path.to_path_buf().into()])
        .with_disable_built_in_roots(true))
}

/// MySQL `ssl-mode` spelling of a [`TlsMode`]
pub fn tls_mode_to_ssl_mode(mode: TlsMode) -> &'static str {
    match mode {
        TlsMode::Disable => "DISABLED",
        TlsMode::Allow | TlsMode::Prefer => "PREFERRED",
        TlsMode::Require => "REQUIRED",
        TlsMode::VerifyCa => "VERIFY_CA",
        TlsMode::VerifyFull => "VERIFY_IDENTITY",
    }
}

/// Query-string parameters describing `config`, e.g.
/// `ssl-mode=VERIFY_CA&ssl-ca=/etc/ssl/ca.pem`.
///
/// The keys round-trip through `ConnectionProperties`.
pub fn build_ssl_params(config: &TlsConfig) -> String {
    let mut params = vec![format!("ssl-mode={}", tls_mode_to_ssl_mode(config.mode))];

    if let Some(ca_cert) = &config.ca_cert {
        params.push(format!("ssl-ca={}", ca_cert.display()));
    }
    if let Some(client_cert) = &config.client_cert {
        params.push(format!("ssl-cert={}", client_cert.display()));
    }
    if let Some(client_key) = &config.client_key {
        params.push(format!("ssl-key={}", client_key.display()));
    }

    params.join("&")
}

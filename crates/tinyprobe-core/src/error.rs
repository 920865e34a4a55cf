//! Error types for tinyprobe

use thiserror::Error;

/// Core error type for tinyprobe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Short, stable name of the error category, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Connection(_) => "connection",
            ProbeError::Query(_) => "query",
            ProbeError::Driver(_) => "driver",
            ProbeError::Configuration(_) => "configuration",
            ProbeError::Security(_) => "security",
            ProbeError::Io(_) => "io",
            ProbeError::Serialization(_) => "serialization",
            ProbeError::NotSupported(_) => "not_supported",
            ProbeError::NotFound(_) => "not_found",
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Other(_) => "other",
        }
    }
}

/// Result type alias for tinyprobe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

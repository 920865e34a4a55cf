//! Logging setup for the `tinyprobe` binary
//!
//! Probe output goes to stdout, so every log line is written to stderr.
//! `RUST_LOG` takes precedence over the `--log-level` option.

use std::io::IsTerminal;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// Emit one JSON object per event instead of compact text
    pub json: bool,

    /// Whether to include file/line information in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            json: false,
            include_location: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Configuration for a `--log-level` value such as `info` or
    /// `warn,tinyprobe_driver_mysql=debug`
    pub fn with_level(level: &str, json: bool) -> Self {
        Self {
            default_filter: level.to_string(),
            json,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.default_filter)
                .with_context(|| format!("invalid log level: {}", self.default_filter)),
        }
    }
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = config.env_filter()?;

    let layer = if config.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .json()
            .with_current_span(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(std::io::stderr().is_terminal())
            .compact()
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("logging was already initialized")?;

    tracing::debug!(filter = %config.default_filter, json = config.json, "logging initialized");
    Ok(())
}

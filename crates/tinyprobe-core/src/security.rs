//! Security-related configuration types for database connections

mod tls_config;

pub use tls_config::*;

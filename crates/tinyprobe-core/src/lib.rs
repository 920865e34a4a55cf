//! tinyprobe core - shared abstractions for the probe client
//!
//! This crate defines the seams the probes talk through:
//!
//! - `DatabaseDriver` - opens connections from a `ConnectionConfig`
//! - `Connection` / `PreparedStatement` - what a probe can do with a session
//! - `ConnectionProperties` - named connection property bags
//! - `PlaceholderTemplate` - client-side `?` substitution
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod driver;
mod error;
mod properties;
pub mod security;
mod statement;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use properties::*;
pub use security::*;
pub use statement::*;
pub use types::*;

//! Connection trait, prepared statements and session metadata

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Transaction isolation levels with their conventional numeric codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    /// MySQL's default
    #[default]
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Numeric code reported next to the level name
    pub fn level_code(&self) -> u8 {
        match self {
            IsolationLevel::ReadUncommitted => 1,
            IsolationLevel::ReadCommitted => 2,
            IsolationLevel::RepeatableRead => 4,
            IsolationLevel::Serializable => 8,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "READ-UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ-COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE-READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(name)
    }
}

/// Client-side session state of an open connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub auto_commit: bool,
    pub read_only: bool,
    pub isolation: IsolationLevel,
    /// Current database
    pub catalog: Option<String>,
    /// Value of the `serverTimezone` property, if one was given
    pub time_zone: Option<String>,
    /// Normalized `characterEncoding` property, if one was given
    pub character_encoding: Option<String>,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            auto_commit: true,
            read_only: false,
            isolation: IsolationLevel::default(),
            catalog: None,
            time_zone: None,
            character_encoding: None,
        }
    }
}

/// What the server announced during the handshake
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Product name, e.g. "MySQL"
    pub product_name: String,
    /// Version as parsed from the handshake, e.g. "5.7.0"
    pub version: String,
    /// Server-assigned connection (thread) id
    pub connection_id: u32,
}

/// A database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g. "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that does not return rows
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Prepare a statement with `?` placeholders
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Check that the server is still answering.
    ///
    /// The default runs `SELECT 1`; drivers with a protocol-level ping
    /// should override this.
    async fn ping(&self) -> Result<()> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }

    /// Handshake information about the server
    fn server_info(&self) -> ServerInfo {
        ServerInfo::default()
    }

    /// Current session state
    fn session(&self) -> SessionInfo {
        SessionInfo::default()
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A prepared statement with 1-based parameter binding
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// SQL text the statement was prepared from
    fn sql(&self) -> &str;

    /// Number of `?` placeholders
    fn parameter_count(&self) -> usize;

    /// Bind `value` to the 1-based parameter `index`
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;

    /// Unbind every parameter
    fn clear_parameters(&mut self);

    /// Execute with the bound parameters, returning rows
    async fn query(&self) -> Result<QueryResult>;

    /// Execute with the bound parameters, discarding rows
    async fn execute(&self) -> Result<StatementResult>;

    /// Close/deallocate the prepared statement
    async fn close(self: Box<Self>) -> Result<()>;
}

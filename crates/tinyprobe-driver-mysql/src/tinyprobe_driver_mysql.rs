//! MySQL driver for tinyprobe, backed by `mysql_async`

mod connection;
mod driver;
mod prepared;
mod tls;

pub use connection::{MySqlConnection, value_to_mysql_literal};
pub use driver::{MySqlDriver, TINY_SQL_DEFAULT_PORT};
pub use prepared::MySqlPreparedStatement;
pub use tls::{MysqlTlsError, TlsPlan, build_ssl_params, tls_mode_to_ssl_mode};

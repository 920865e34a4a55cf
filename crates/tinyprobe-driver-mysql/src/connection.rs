//! MySQL connection implementation

use async_trait::async_trait;
use mysql_async::{
    Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row as MySqlRow, SslOpts,
    consts::{ColumnFlags, ColumnType},
    prelude::*,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tinyprobe_core::{
    ColumnMeta, Connection, ConnectionConfig, PARAM_CHARACTER_ENCODING, PARAM_READ_ONLY,
    PARAM_SERVER_TIMEZONE, PlaceholderTemplate, PreparedStatement, ProbeError, QueryResult,
    Result, Row, ServerInfo, SessionInfo, StatementResult, Value,
};

use crate::{MySqlPreparedStatement, TINY_SQL_DEFAULT_PORT, TlsPlan};

/// Announced to the driver up front so it does not query `@@max_allowed_packet`
const MAX_ALLOWED_PACKET: usize = 16 * 1024 * 1024;
/// Announced to the driver up front so it does not query `@@wait_timeout`
const WAIT_TIMEOUT_SECS: usize = 28_800;

/// A single server session.
///
/// Backed by a `mysql_async` pool pinned to exactly one connection, so the
/// server-side connection id stays stable for the lifetime of the value.
pub struct MySqlConnection {
    pool: Pool,
    server: ServerInfo,
    session: SessionInfo,
    closed: Arc<AtomicBool>,
}

impl MySqlConnection {
    /// Connect using `config`, bounded by `config.connect_timeout`.
    ///
    /// With `Allow`/`Prefer` TLS a failed encrypted attempt is retried in
    /// plaintext.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let host = if config.host.is_empty() {
            "localhost"
        } else {
            config.host.as_str()
        };
        let port = if config.port > 0 {
            config.port
        } else {
            TINY_SQL_DEFAULT_PORT
        };
        tracing::info!(host = %host, port = %port, database = ?config.database, "connecting to MySQL server");

        let tls = TlsPlan::for_config(&config.tls)?;

        let (pool, server) = match open_pool(config, host, port, tls.first_attempt()).await {
            Err(e) if tls.retry_in_plaintext(&e) => {
                tracing::warn!(error = %e, "TLS connection failed, retrying without TLS");
                open_pool(config, host, port, None).await?
            }
            attempt => attempt?,
        };

        let session = SessionInfo {
            catalog: config.database.clone(),
            time_zone: config.params.get(PARAM_SERVER_TIMEZONE).cloned(),
            character_encoding: config.params.get(PARAM_CHARACTER_ENCODING).cloned(),
            read_only: config
                .params
                .get(PARAM_READ_ONLY)
                .is_some_and(|v| v == "true"),
            ..SessionInfo::default()
        };

        tracing::info!(
            connection_id = server.connection_id,
            server_version = %server.version,
            "MySQL connection established"
        );
        Ok(Self {
            pool,
            server,
            session,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

async fn open_pool(
    config: &ConnectionConfig,
    host: &str,
    port: u16,
    ssl_opts: Option<SslOpts>,
) -> Result<(Pool, ServerInfo)> {
    let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
        ProbeError::Connection("Failed to configure MySQL pool constraints (min=1, max=1)".into())
    })?;
    let pool_opts = PoolOpts::default()
        .with_constraints(constraints)
        .with_reset_connection(false);

    // Tiny-SQL answers nothing but plain queries, so skip every
    // settings lookup the driver would otherwise issue after the handshake.
    let opts: Opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .db_name(config.database.as_deref())
        .user(config.username.as_deref())
        .pass(config.password.as_deref())
        .prefer_socket(false)
        .max_allowed_packet(Some(MAX_ALLOWED_PACKET))
        .wait_timeout(Some(WAIT_TIMEOUT_SECS))
        .ssl_opts(ssl_opts)
        .pool_opts(pool_opts)
        .into();

    let pool = Pool::new(opts);
    let conn = match tokio::time::timeout(config.connect_timeout, pool.get_conn()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to connect to MySQL server");
            return Err(ProbeError::Connection(e.to_string()));
        }
        Err(_) => {
            return Err(ProbeError::Timeout(format!(
                "no handshake from {}:{} within {} ms",
                host,
                port,
                config.connect_timeout.as_millis()
            )));
        }
    };

    let (major, minor, patch) = conn.server_version();
    let server = ServerInfo {
        product_name: "MySQL".to_string(),
        version: format!("{}.{}.{}", major, minor, patch),
        connection_id: conn.id(),
    };
    drop(conn);

    Ok((pool, server))
}

pub(crate) fn ensure_open(closed: &AtomicBool) -> Result<()> {
    if closed.load(Ordering::SeqCst) {
        return Err(ProbeError::Connection("connection is closed".into()));
    }
    Ok(())
}

async fn get_conn(pool: &Pool) -> Result<Conn> {
    pool.get_conn()
        .await
        .map_err(|e| ProbeError::Connection(format!("Failed to get MySQL connection: {}", e)))
}

/// Substitute `params` into the `?` placeholders of `sql`
pub(crate) fn bind_sql(sql: &str, params: &[Value]) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }
    PlaceholderTemplate::parse(sql).render(params, value_to_mysql_literal)
}

pub(crate) async fn run_query(pool: &Pool, sql: &str) -> Result<QueryResult> {
    let start_time = Instant::now();
    let mut conn = get_conn(pool).await?;

    let mysql_rows: Vec<MySqlRow> = conn
        .query(sql)
        .await
        .map_err(|e| ProbeError::Query(e.to_string()))?;

    let mut columns = Vec::new();
    let mut column_names = Vec::new();
    let mut column_types = Vec::new();

    if let Some(first_row) = mysql_rows.first() {
        for (idx, col) in first_row.columns_ref().iter().enumerate() {
            let name = col.name_str().to_string();
            column_names.push(name.clone());
            column_types.push(col.column_type());

            columns.push(ColumnMeta {
                name,
                data_type: format!("{:?}", col.column_type()),
                nullable: !col.flags().contains(ColumnFlags::NOT_NULL_FLAG),
                ordinal: idx,
                max_length: Some(col.column_length() as i64),
            });
        }
    }

    let rows = mysql_rows
        .into_iter()
        .map(|mysql_row| {
            let values = column_types
                .iter()
                .enumerate()
                .map(|(idx, col_type)| {
                    let raw: mysql_async::Value =
                        mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                    mysql_value_to_value(raw, *col_type)
                })
                .collect();
            Row::new(column_names.clone(), values)
        })
        .collect::<Vec<_>>();

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        row_count = rows.len(),
        execution_time_ms = execution_time_ms,
        "query executed"
    );

    Ok(QueryResult {
        columns,
        rows,
        affected_rows: conn.affected_rows(),
        execution_time_ms,
        warnings: Vec::new(),
    })
}

pub(crate) async fn run_execute(pool: &Pool, sql: &str) -> Result<StatementResult> {
    let start_time = Instant::now();
    let mut conn = get_conn(pool).await?;

    conn.query_drop(sql)
        .await
        .map_err(|e| ProbeError::Query(e.to_string()))?;

    let result = StatementResult {
        affected_rows: conn.affected_rows(),
        last_insert_id: conn.last_insert_id(),
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    };
    tracing::debug!(affected_rows = result.affected_rows, "statement executed");
    Ok(result)
}

/// Render a value as a MySQL literal.
///
/// Strings escape backslashes before quotes, so an escaped quote can never
/// be reopened by a trailing backslash.
pub fn value_to_mysql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float32(v) if v.is_finite() => v.to_string(),
        Value::Float64(v) if v.is_finite() => v.to_string(),
        Value::Float32(v) => quote(&v.to_string()),
        Value::Float64(v) => quote(&v.to_string()),
        Value::Decimal(v) if is_numeric_literal(v.trim()) => v.trim().to_string(),
        Value::Decimal(v) | Value::String(v) => quote(v),
        Value::Bytes(v) => {
            let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
            format!("X'{}'", hex)
        }
        Value::Date(v) => format!("'{}'", v),
        Value::Time(v) => format!("'{}'", v),
        Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::DateTimeUtc(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
    }
}

/// `[+-]digits[.digits][e[+-]digits]`, the only decimal text sent unquoted
fn is_numeric_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e.strip_prefix(['+', '-']).unwrap_or(e))),
        None => (unsigned, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    !(whole.is_empty() && fraction.is_empty())
        && all_digits(whole)
        && all_digits(fraction)
        && exponent.is_none_or(|e| !e.is_empty() && all_digits(e))
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\0', "\\0");
    format!("'{}'", escaped)
}

/// Convert mysql_async Value to our Value type, using column type metadata
/// to interpret byte strings from the text protocol.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT => {
                    s.parse::<f32>().map(Value::Float32).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => i64::try_from(u)
            .map(Value::Int64)
            .unwrap_or_else(|_| Value::Decimal(u.to_string())),
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                date.map(Value::Date).unwrap_or_else(|| {
                    Value::String(format!("{:04}-{:02}-{:02}", year, month, day))
                })
            } else {
                date.and_then(|d| d.and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro))
                    .map(Value::DateTime)
                    .unwrap_or_else(|| {
                        Value::String(format!(
                            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                            year, month, day, hour, min, sec
                        ))
                    })
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        ensure_open(&self.closed)?;
        let final_sql = bind_sql(sql, params)?;
        run_execute(&self.pool, &final_sql).await
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        ensure_open(&self.closed)?;
        let final_sql = bind_sql(sql, params)?;
        run_query(&self.pool, &final_sql).await
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        ensure_open(&self.closed)?;
        Ok(Box::new(MySqlPreparedStatement::new(
            self.pool.clone(),
            self.closed.clone(),
            sql,
        )))
    }

    /// Sends `COM_PING` rather than a query
    async fn ping(&self) -> Result<()> {
        ensure_open(&self.closed)?;
        let mut conn = get_conn(&self.pool).await?;
        conn.ping()
            .await
            .map_err(|e| ProbeError::Connection(format!("ping failed: {}", e)))
    }

    fn server_info(&self) -> ServerInfo {
        self.server.clone()
    }

    fn session(&self) -> SessionInfo {
        self.session.clone()
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(connection_id = self.server.connection_id, "closing MySQL connection");
        self.pool
            .clone()
            .disconnect()
            .await
            .map_err(|e| ProbeError::Connection(format!("Failed to close MySQL connection: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_literals_escape_backslash_before_quote() {
        assert_eq!(value_to_mysql_literal(&Value::from("plain")), "'plain'");
        assert_eq!(value_to_mysql_literal(&Value::from("it's")), "'it\\'s'");
        assert_eq!(value_to_mysql_literal(&Value::from("a\\")), "'a\\\\'");
        assert_eq!(value_to_mysql_literal(&Value::from("\\'")), "'\\\\\\''");
        assert_eq!(value_to_mysql_literal(&Value::from("nul\0")), "'nul\\0'");
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(value_to_mysql_literal(&Value::Int32(42)), "42");
        assert_eq!(value_to_mysql_literal(&Value::Int64(-7)), "-7");
        assert_eq!(value_to_mysql_literal(&Value::Null), "NULL");
        assert_eq!(value_to_mysql_literal(&Value::Bool(true)), "1");
        assert_eq!(value_to_mysql_literal(&Value::Float64(1.5)), "1.5");
        assert_eq!(value_to_mysql_literal(&Value::Float64(f64::NAN)), "'NaN'");
        assert_eq!(value_to_mysql_literal(&Value::Bytes(vec![0xab, 0x01])), "X'ab01'");
        assert_eq!(value_to_mysql_literal(&Value::Decimal("3.14".into())), "3.14");
        assert_eq!(
            value_to_mysql_literal(&Value::Decimal("1; DROP".into())),
            "'1; DROP'"
        );
    }

    #[test]
    fn test_decimal_literals_only_unquoted_when_numeric() {
        for numeric in ["0", "-12.50", "+.5", "1e10", "6.02E+23", "18446744073709551615"] {
            assert_eq!(
                value_to_mysql_literal(&Value::Decimal(numeric.into())),
                numeric,
                "{numeric}"
            );
        }
        for text in ["NaN", "inf", "-infinity", "1e", ".", "1.2.3", "0x1F", ""] {
            assert_eq!(
                value_to_mysql_literal(&Value::Decimal(text.into())),
                format!("'{text}'"),
                "{text}"
            );
        }
    }

    #[test]
    fn test_bind_sql_substitutes_in_order() {
        let sql = bind_sql(
            "SELECT ? as result, '?' as literal, ?",
            &[Value::Int32(42), Value::from("o'k")],
        )
        .unwrap();
        assert_eq!(sql, "SELECT 42 as result, '?' as literal, 'o\\'k'");
    }

    #[test]
    fn test_bind_sql_without_params_keeps_question_marks() {
        assert_eq!(bind_sql("SELECT '?'", &[]).unwrap(), "SELECT '?'");
        assert!(bind_sql("SELECT ?", &[Value::Int32(1), Value::Int32(2)]).is_err());
    }

    #[test]
    fn test_text_protocol_values_follow_column_type() {
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Bytes(b"1".to_vec()),
                ColumnType::MYSQL_TYPE_LONGLONG
            ),
            Value::Int64(1)
        );
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Bytes(b"5.7.0".to_vec()),
                ColumnType::MYSQL_TYPE_VAR_STRING
            ),
            Value::String("5.7.0".into())
        );
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Bytes(b"12.50".to_vec()),
                ColumnType::MYSQL_TYPE_NEWDECIMAL
            ),
            Value::Decimal("12.50".into())
        );
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Bytes(vec![0xff]),
                ColumnType::MYSQL_TYPE_BLOB
            ),
            Value::Bytes(vec![0xff])
        );
        assert_eq!(
            mysql_value_to_value(mysql_async::Value::NULL, ColumnType::MYSQL_TYPE_NULL),
            Value::Null
        );
    }

    #[test]
    fn test_binary_values_convert() {
        assert_eq!(
            mysql_value_to_value(mysql_async::Value::UInt(u64::MAX), ColumnType::MYSQL_TYPE_LONGLONG),
            Value::Decimal(u64::MAX.to_string())
        );
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Date(2024, 2, 29, 0, 0, 0, 0),
                ColumnType::MYSQL_TYPE_DATE
            ),
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(
            mysql_value_to_value(
                mysql_async::Value::Time(true, 1, 2, 3, 4, 0),
                ColumnType::MYSQL_TYPE_TIME
            ),
            Value::String("-26:03:04.000000".into())
        );
    }

    #[test]
    fn test_closed_flag_rejects_work() {
        let closed = AtomicBool::new(false);
        assert!(ensure_open(&closed).is_ok());
        closed.store(true, Ordering::SeqCst);
        assert_eq!(ensure_open(&closed).unwrap_err().kind(), "connection");
    }
}

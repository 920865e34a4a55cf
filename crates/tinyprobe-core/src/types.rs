//! Core value and result types

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A database value that can represent any scalar SQL type the probes read back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
}

impl Value {
    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    ///
    /// Text-protocol servers frequently send integers as strings, so numeric
    /// strings are parsed as well.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            Value::Decimal(s) | Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => match std::str::from_utf8(v) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "<{} bytes>", v.len()),
            },
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
        }
    }
}

/// A row from a query result
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
    columns: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column label.
    ///
    /// An exact match wins; otherwise the first case-insensitive match is used,
    /// the way MySQL resolves column labels.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
            .and_then(|idx| self.values.get(idx))
    }

    /// Get column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnMeta {
    /// Column label
    #[serde(default)]
    pub name: String,
    /// Wire type reported by the server
    #[serde(default)]
    pub data_type: String,
    /// Whether the column can be NULL
    #[serde(default)]
    pub nullable: bool,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
    /// Maximum display length reported by the server
    #[serde(default)]
    pub max_length: Option<i64>,
}

/// Query result
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Column metadata
    pub columns: Vec<ColumnMeta>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Rows affected (for DML statements)
    pub affected_rows: u64,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
    /// Warnings from the database
    pub warnings: Vec<String>,
}

impl QueryResult {
    /// Create a new empty query result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            execution_time_ms: 0,
            warnings: Vec::new(),
        }
    }

    /// Check if the result has rows
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First row, if any
    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Value of `column` in the first row.
    ///
    /// Falls back to the first column when the label is not present, since
    /// servers are not consistent about echoing `AS` aliases.
    pub fn scalar(&self, column: &str) -> Option<&Value> {
        let row = self.first_row()?;
        row.get_by_name(column).or_else(|| row.get(0))
    }
}

/// Result of a statement that does not return rows
#[derive(Debug, Clone, Default)]
pub struct StatementResult {
    /// Rows affected
    pub affected_rows: u64,
    /// Last generated auto-increment id, if the server reported one
    pub last_insert_id: Option<u64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_row(column: &str, value: Value) -> QueryResult {
        let mut result = QueryResult::empty();
        result.columns.push(ColumnMeta {
            name: column.to_string(),
            ..Default::default()
        });
        result
            .rows
            .push(Row::new(vec![column.to_string()], vec![value]));
        result
    }

    #[test]
    fn test_as_i64_parses_text_protocol_values() {
        assert_eq!(Value::String("42".into()).as_i64(), Some(42));
        assert_eq!(Value::Bytes(b"7".to_vec()).as_i64(), Some(7));
        assert_eq!(Value::Int32(-3).as_i64(), Some(-3));
        assert_eq!(Value::String("abc".into()).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_row_lookup_is_case_insensitive_fallback() {
        let row = Row::new(
            vec!["Result".into(), "result".into()],
            vec![Value::Int64(1), Value::Int64(2)],
        );
        assert_eq!(row.get_by_name("result"), Some(&Value::Int64(2)));
        assert_eq!(row.get_by_name("RESULT"), Some(&Value::Int64(1)));
        assert_eq!(row.get_by_name("missing"), None);
    }

    #[test]
    fn test_scalar_falls_back_to_first_column() {
        let result = single_row("VERSION()", Value::String("5.7.0-tiny".into()));
        assert_eq!(
            result.scalar("version"),
            Some(&Value::String("5.7.0-tiny".into()))
        );
        assert!(QueryResult::empty().scalar("version").is_none());
    }

    #[test]
    fn test_display_bytes_as_text_when_utf8() {
        assert_eq!(Value::Bytes(b"test".to_vec()).to_string(), "test");
        assert_eq!(Value::Bytes(vec![0xff, 0xfe]).to_string(), "<2 bytes>");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}

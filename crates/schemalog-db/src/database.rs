//! The database capability the migration engine runs against.
//!
//! Statement failures are values, not `schemalog_common::Error`s: the engine
//! classifies them by SQLSTATE and keeps going.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// SQLSTATE reported for a statement that completed normally.
pub const SQLSTATE_SUCCESS: &str = "00000";
/// SQLSTATE class for a generic warning.
pub const SQLSTATE_WARNING: &str = "01000";
/// SQLSTATE used when the driver gives no more specific code.
pub const SQLSTATE_GENERAL_ERROR: &str = "HY000";

/// A failed statement, as reported by the driver.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("[{sqlstate}] {message}")]
pub struct StatementError {
    pub sqlstate: String,
    pub message: String,
}

impl StatementError {
    pub fn new(sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(SQLSTATE_GENERAL_ERROR, message)
    }

    /// Success and generic-warning states are reported by some drivers as
    /// failures even though the statement took effect.
    pub fn is_benign(&self) -> bool {
        self.sqlstate == SQLSTATE_SUCCESS || self.sqlstate == SQLSTATE_WARNING
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Mysql => write!(f, "mysql"),
        }
    }
}

/// A bound positional parameter (`?`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param<'a> {
    Text(&'a str),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

pub type Row = Vec<Value>;

/// A connection capable of running raw SQL.
///
/// Methods take `&self`; implementations serialise access internally so a
/// ledger and the engine can share one handle.
pub trait Database {
    fn dialect(&self) -> Dialect;

    /// Execute one statement and return the number of affected rows.
    /// Statements that produce rows are drained and report 0.
    fn execute(&self, sql: &str) -> Result<u64, StatementError>;

    fn execute_with(&self, sql: &str, params: &[Param<'_>]) -> Result<u64, StatementError>;

    fn query_rows(&self, sql: &str, params: &[Param<'_>]) -> Result<Vec<Row>, StatementError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_states_are_benign() {
        assert!(StatementError::new("00000", "").is_benign());
        assert!(StatementError::new("01000", "note").is_benign());
        assert!(!StatementError::new("42S02", "table missing").is_benign());
        assert!(!StatementError::general("boom").is_benign());
    }

    #[test]
    fn statement_error_display() {
        let e = StatementError::new("42000", "syntax error near 'SELEC'");
        assert_eq!(e.to_string(), "[42000] syntax error near 'SELEC'");
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Text(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(Value::Null.as_i64(), None);
        assert_eq!(Value::Text("a.sql".into()).as_str(), Some("a.sql"));
        assert_eq!(Value::Int(1).as_str(), None);
    }
}

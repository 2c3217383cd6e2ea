use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode, params_from_iter};
use schemalog_common::{Error, Result};
use tracing::info;

use crate::database::{Database, Dialect, Param, Row, StatementError, Value};

/// SQLSTATE for integrity constraint violations.
const SQLSTATE_CONSTRAINT: &str = "23000";

/// SQLite-backed database handle.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening sqlite database at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Connection(format!("failed to open database: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("failed to open in-memory database: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> std::result::Result<MutexGuard<'_, Connection>, StatementError> {
        self.conn
            .lock()
            .map_err(|_| StatementError::general("sqlite connection lock poisoned"))
    }
}

fn statement_error(e: rusqlite::Error) -> StatementError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StatementError::new(SQLSTATE_CONSTRAINT, e.to_string())
        }
        _ => StatementError::general(e.to_string()),
    }
}

fn bind(params: &[Param<'_>]) -> Vec<SqlValue> {
    params
        .iter()
        .map(|p| match p {
            Param::Text(s) => SqlValue::Text((*s).to_string()),
            Param::Int(i) => SqlValue::Integer(*i),
        })
        .collect()
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Text(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&self, sql: &str) -> std::result::Result<u64, StatementError> {
        self.execute_with(sql, &[])
    }

    fn execute_with(
        &self,
        sql: &str,
        params: &[Param<'_>],
    ) -> std::result::Result<u64, StatementError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(statement_error)?;
        let bound = bind(params);

        // rusqlite refuses `execute` for row-returning statements (SELECT,
        // some PRAGMAs), so step those to completion instead.
        if stmt.column_count() > 0 {
            let mut rows = stmt
                .query(params_from_iter(bound.iter()))
                .map_err(statement_error)?;
            while rows.next().map_err(statement_error)?.is_some() {}
            return Ok(0);
        }

        stmt.execute(params_from_iter(bound.iter()))
            .map(|n| n as u64)
            .map_err(statement_error)
    }

    fn query_rows(
        &self,
        sql: &str,
        params: &[Param<'_>],
    ) -> std::result::Result<Vec<Row>, StatementError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(statement_error)?;
        let column_count = stmt.column_count();
        let bound = bind(params);

        let mut rows = stmt
            .query(params_from_iter(bound.iter()))
            .map_err(statement_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(statement_error)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(read_value(row.get_ref(i).map_err(statement_error)?));
            }
            out.push(values);
        }
        Ok(out)
    }
}

use std::sync::{Mutex, MutexGuard};

use ::mysql::prelude::Queryable;
use ::mysql::{Conn, OptsBuilder, Params, Value as MyValue};
use schemalog_common::{Error, Result};
use schemalog_config::MysqlParams;
use tracing::info;

use crate::database::{Database, Dialect, Param, Row, StatementError, Value};

/// MySQL-backed database handle.
pub struct MysqlDatabase {
    conn: Mutex<Conn>,
}

impl MysqlDatabase {
    pub fn connect(params: &MysqlParams) -> Result<Self> {
        info!(
            "connecting to mysql at {}:{} as {} (database {})",
            params.host,
            params.port(),
            params.username,
            params.database
        );
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(params.host.clone()))
            .tcp_port(params.port())
            .user(Some(params.username.clone()))
            .pass(Some(params.password.clone()))
            .db_name(Some(params.database.clone()))
            .init(vec!["SET NAMES utf8mb4"]);

        let conn = Conn::new(opts).map_err(|e| {
            Error::Connection(format!(
                "failed to connect to mysql at {}:{}: {e}",
                params.host,
                params.port()
            ))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> std::result::Result<MutexGuard<'_, Conn>, StatementError> {
        self.conn
            .lock()
            .map_err(|_| StatementError::general("mysql connection lock poisoned"))
    }
}

fn statement_error(e: ::mysql::Error) -> StatementError {
    match e {
        ::mysql::Error::MySqlError(server) => StatementError::new(server.state, server.message),
        other => StatementError::general(other.to_string()),
    }
}

fn bind(params: &[Param<'_>]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|p| match p {
                Param::Text(s) => MyValue::Bytes(s.as_bytes().to_vec()),
                Param::Int(i) => MyValue::Int(*i),
            })
            .collect(),
    )
}

fn read_value(value: MyValue) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::Int(i),
        MyValue::UInt(u) => i64::try_from(u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(u.to_string())),
        MyValue::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
        other => Value::Text(other.as_sql(true)),
    }
}

impl Database for MysqlDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn execute(&self, sql: &str) -> std::result::Result<u64, StatementError> {
        let mut conn = self.connection()?;
        conn.query_drop(sql).map_err(statement_error)?;
        Ok(conn.affected_rows())
    }

    fn execute_with(
        &self,
        sql: &str,
        params: &[Param<'_>],
    ) -> std::result::Result<u64, StatementError> {
        let mut conn = self.connection()?;
        conn.exec_drop(sql, bind(params)).map_err(statement_error)?;
        Ok(conn.affected_rows())
    }

    fn query_rows(
        &self,
        sql: &str,
        params: &[Param<'_>],
    ) -> std::result::Result<Vec<Row>, StatementError> {
        let mut conn = self.connection()?;
        let rows: Vec<::mysql::Row> = conn.exec(sql, bind(params)).map_err(statement_error)?;
        Ok(rows
            .into_iter()
            .map(|row| row.unwrap().into_iter().map(read_value).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_keep_their_sqlstate() {
        let err = statement_error(::mysql::Error::MySqlError(::mysql::MySqlError {
            state: "42S02".into(),
            message: "Table 'app.missing' doesn't exist".into(),
            code: 1146,
        }));
        assert_eq!(err.sqlstate, "42S02");
        assert!(!err.is_benign());
    }

    #[test]
    fn params_bind_positionally() {
        assert!(matches!(bind(&[]), Params::Empty));
        match bind(&[Param::Text("a.sql"), Param::Int(5)]) {
            Params::Positional(values) => {
                assert_eq!(values, vec![MyValue::Bytes(b"a.sql".to_vec()), MyValue::Int(5)]);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn values_decode() {
        assert_eq!(read_value(MyValue::NULL), Value::Null);
        assert_eq!(read_value(MyValue::UInt(3)), Value::Int(3));
        assert_eq!(
            read_value(MyValue::Bytes(b"x.sql".to_vec())),
            Value::Text("x.sql".into())
        );
    }
}

pub mod database;
pub mod ledger;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

use schemalog_common::Result;
use schemalog_config::DatabaseConfig;
use schemalog_config::model::is_memory_path;

pub use database::{
    Database, Dialect, Param, Row, SQLSTATE_GENERAL_ERROR, SQLSTATE_SUCCESS, SQLSTATE_WARNING,
    StatementError, Value,
};
pub use ledger::{Ledger, LedgerEntry, MAX_FILENAME_LEN, MemoryLedger, TableLedger};
#[cfg(feature = "mysql")]
pub use crate::mysql::MysqlDatabase;
pub use sqlite::SqliteDatabase;

/// Open a database handle for the configured driver.
///
/// Fails with `Error::Connection` when the handle cannot be established or
/// the driver was not compiled into this build.
pub fn connect(config: &DatabaseConfig) -> Result<Box<dyn Database>> {
    match config {
        DatabaseConfig::Sqlite { path } if is_memory_path(path) => {
            Ok(Box::new(SqliteDatabase::in_memory()?))
        }
        DatabaseConfig::Sqlite { path } => Ok(Box::new(SqliteDatabase::open(path)?)),
        #[cfg(feature = "mysql")]
        DatabaseConfig::Mysql(params) => Ok(Box::new(MysqlDatabase::connect(params)?)),
        #[cfg(not(feature = "mysql"))]
        DatabaseConfig::Mysql(_) => Err(schemalog_common::Error::Connection(
            "mysql support not compiled in; rebuild with `--features mysql`".into(),
        )),
    }
}

//! Applies SQL migration files from a directory exactly once each.
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use schemalog_config::DatabaseConfig;
//!
//! let database = DatabaseConfig::Sqlite { path: PathBuf::from("app.db") };
//! let summary = schemalog_engine::start(Path::new("migrations"), &database, false)?;
//! println!("{summary}");
//! # Ok::<(), schemalog_common::Error>(())
//! ```

pub mod discovery;
pub mod migrator;

use std::path::Path;

use schemalog_common::Result;
use schemalog_config::{DatabaseConfig, MigrateOptions};
use schemalog_db::TableLedger;

pub use discovery::list_files;
pub use migrator::{Failure, FailureKind, Migrator, RunResult};

/// Connect, migrate `directory` with default options and return a summary
/// such as `"3 new files migrated."`. With `reset`, files are only recorded.
pub fn start(directory: &Path, database: &DatabaseConfig, reset: bool) -> Result<String> {
    let options = if reset {
        MigrateOptions::log_only()
    } else {
        MigrateOptions::default()
    };
    start_with(directory, database, &options).map(|result| result.summary())
}

/// Mark every file in `directory` as applied without executing any of them.
pub fn reset(directory: &Path, database: &DatabaseConfig) -> Result<String> {
    start(directory, database, true)
}

pub fn start_with(
    directory: &Path,
    database: &DatabaseConfig,
    options: &MigrateOptions,
) -> Result<RunResult> {
    let db = schemalog_db::connect(database)?;
    let ledger = TableLedger::new(db.as_ref(), &options.ledger_table)?;
    Migrator::new(db.as_ref(), &ledger, options.clone()).run(directory)
}

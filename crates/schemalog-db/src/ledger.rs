//! Persistent record of which migration files have been applied.

use std::sync::{Mutex, MutexGuard};

use schemalog_common::{Error, Result};
use schemalog_config::validation::ConfigValidator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::{Database, Dialect, Param, Value};

/// Longest filename the ledger column holds.
pub const MAX_FILENAME_LEN: usize = 250;

/// One applied migration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub filename: String,
    /// Unix timestamp (seconds) of when the file was recorded.
    pub applied_at: i64,
}

/// Storage for applied-migration records.
///
/// `record_applied` does not check for duplicates; callers only record
/// filenames that `is_applied` has just reported absent.
pub trait Ledger {
    /// Create the backing store if it does not exist. Safe on every run.
    fn ensure_schema(&self) -> Result<()>;

    fn is_applied(&self, filename: &str) -> Result<bool>;

    fn record_applied(&self, filename: &str, applied_at: i64) -> Result<()>;

    /// All entries in insertion order.
    fn entries(&self) -> Result<Vec<LedgerEntry>>;
}

/// Ledger stored in a SQL table on the migrated database itself.
pub struct TableLedger<'a> {
    db: &'a dyn Database,
    table: String,
}

impl<'a> TableLedger<'a> {
    pub fn new(db: &'a dyn Database, table: &str) -> Result<Self> {
        ConfigValidator::validate_identifier(table)?;
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    pub fn create_table_sql(&self) -> String {
        match self.db.dialect() {
            Dialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    filename VARCHAR({MAX_FILENAME_LEN}) NOT NULL,
                    migrated_at_timestamp INTEGER NOT NULL
                )",
                self.table
            ),
            Dialect::Mysql => format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    ID INT(11) AUTO_INCREMENT PRIMARY KEY,
                    filename VARCHAR({MAX_FILENAME_LEN}) NOT NULL,
                    migrated_at_timestamp INT(11) NOT NULL
                )",
                self.table
            ),
        }
    }
}

impl Ledger for TableLedger<'_> {
    fn ensure_schema(&self) -> Result<()> {
        match self.db.execute(&self.create_table_sql()) {
            Ok(_) => Ok(()),
            Err(e) if e.is_benign() => Ok(()),
            Err(e) => Err(Error::Schema(format!(
                "failed to create ledger table {}: {e}",
                self.table
            ))),
        }
    }

    fn is_applied(&self, filename: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE filename = ? LIMIT 1", self.table);
        let rows = self
            .db
            .query_rows(&sql, &[Param::Text(filename)])
            .map_err(|e| Error::Database(format!("failed to look up {filename}: {e}")))?;
        Ok(!rows.is_empty())
    }

    fn record_applied(&self, filename: &str, applied_at: i64) -> Result<()> {
        let length = filename.chars().count();
        if length > MAX_FILENAME_LEN {
            return Err(Error::Database(format!(
                "cannot record {filename}: {length} characters exceeds {MAX_FILENAME_LEN}"
            )));
        }
        let sql = format!(
            "INSERT INTO {} (filename, migrated_at_timestamp) VALUES (?, ?)",
            self.table
        );
        self.db
            .execute_with(&sql, &[Param::Text(filename), Param::Int(applied_at)])
            .map_err(|e| Error::Database(format!("failed to record {filename}: {e}")))?;
        debug!("recorded {filename} in {}", self.table);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT id, filename, migrated_at_timestamp FROM {} ORDER BY id",
            self.table
        );
        let rows = self
            .db
            .query_rows(&sql, &[])
            .map_err(|e| Error::Database(format!("failed to read ledger: {e}")))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(parse_entry(&row)?);
        }
        Ok(entries)
    }
}

fn parse_entry(row: &[Value]) -> Result<LedgerEntry> {
    let malformed = || Error::Database(format!("malformed ledger row: {row:?}"));
    match row {
        [id, filename, applied_at] => Ok(LedgerEntry {
            id: id.as_i64().ok_or_else(malformed)?,
            filename: filename.as_str().ok_or_else(malformed)?.to_string(),
            applied_at: applied_at.as_i64().ok_or_else(malformed)?,
        }),
        _ => Err(malformed()),
    }
}

/// Ledger held in process memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that already lists `filenames`, stamped at time 0.
    pub fn with_applied<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = filenames
            .into_iter()
            .enumerate()
            .map(|(i, name)| LedgerEntry {
                id: i as i64 + 1,
                filename: name.into(),
                applied_at: 0,
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LedgerEntry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Database("memory ledger lock poisoned".into()))
    }
}

impl Ledger for MemoryLedger {
    fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    fn is_applied(&self, filename: &str) -> Result<bool> {
        Ok(self.lock()?.iter().any(|e| e.filename == filename))
    }

    fn record_applied(&self, filename: &str, applied_at: i64) -> Result<()> {
        let mut entries = self.lock()?;
        let id = entries.last().map_or(1, |e| e.id + 1);
        entries.push(LedgerEntry {
            id,
            filename: filename.to_string(),
            applied_at,
        });
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.lock()?.clone())
    }
}

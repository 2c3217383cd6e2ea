//! The reconciliation engine: discovered files minus ledger entries,
//! executed in order and recorded.

use std::path::Path;

use chrono::Utc;
use schemalog_common::Result;
use schemalog_config::MigrateOptions;
use schemalog_db::{Database, Ledger, MAX_FILENAME_LEN, StatementError};
use schemalog_sql::StatementSplitter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::discovery::list_files;

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    /// Files that were not yet in the ledger, in the order they were processed.
    pub files_considered: Vec<String>,
    /// Files recorded in the ledger during this run.
    pub files_applied: usize,
    /// Non-fatal problems; none of these stopped the run.
    pub failures: Vec<Failure>,
}

impl RunResult {
    pub fn summary(&self) -> String {
        format!("{} new files migrated.", self.files_applied)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub filename: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    /// The file could not be read.
    Read { message: String },
    /// The name does not fit the ledger's filename column. The file is
    /// neither executed nor recorded.
    FilenameTooLong { length: usize, max: usize },
    /// A statement was rejected by the database.
    Statement {
        /// Position of the statement within its file, from 0.
        index: usize,
        statement: String,
        error: StatementError,
    },
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FailureKind::Read { message } => {
                write!(f, "error reading {}: {message}", self.filename)
            }
            FailureKind::FilenameTooLong { length, max } => write!(
                f,
                "error with {}: name is {length} characters, the ledger holds at most {max}",
                self.filename
            ),
            FailureKind::Statement { index, error, .. } => {
                write!(f, "error with {} (statement {}): {error}", self.filename, index + 1)
            }
        }
    }
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Applies new migration files against a database and records them in a ledger.
///
/// Files and statements are processed strictly in sequence. A statement
/// failure is reported in [`RunResult::failures`] and the run continues with
/// the next statement; only directory, schema and ledger errors abort.
pub struct Migrator<'a> {
    db: &'a dyn Database,
    ledger: &'a dyn Ledger,
    options: MigrateOptions,
    splitter: StatementSplitter,
    clock: fn() -> i64,
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a dyn Database, ledger: &'a dyn Ledger, options: MigrateOptions) -> Self {
        let splitter = StatementSplitter::new(options.statement_delimiter.clone());
        Self {
            db,
            ledger,
            options,
            splitter,
            clock: unix_now,
        }
    }

    /// Replace the source of ledger timestamps.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Files in `directory` that the ledger does not list yet, ascending.
    pub fn pending(&self, directory: &Path) -> Result<Vec<String>> {
        self.ledger.ensure_schema()?;

        let mut new_files = Vec::new();
        for filename in list_files(directory)? {
            if !self.ledger.is_applied(&filename)? {
                new_files.push(filename);
            }
        }
        new_files.sort();
        Ok(new_files)
    }

    pub fn run(&self, directory: &Path) -> Result<RunResult> {
        let new_files = self.pending(directory)?;
        if new_files.is_empty() {
            info!("no new migrations in {}", directory.display());
        } else if self.options.log_only {
            info!(
                "recording {} new files without executing them",
                new_files.len()
            );
        } else {
            info!("applying {} new files", new_files.len());
        }

        let mut result = RunResult::default();
        for filename in &new_files {
            let length = filename.chars().count();
            if length > MAX_FILENAME_LEN {
                let failure = Failure {
                    filename: filename.clone(),
                    kind: FailureKind::FilenameTooLong {
                        length,
                        max: MAX_FILENAME_LEN,
                    },
                };
                warn!("{failure}");
                result.failures.push(failure);
                continue;
            }

            let failures = if self.options.log_only {
                Vec::new()
            } else {
                self.apply_file(directory, filename)
            };

            let failed = !failures.is_empty();
            result.failures.extend(failures);
            if failed && !self.options.mark_applied_on_failure {
                warn!("leaving {filename} pending after failures");
                continue;
            }

            self.ledger.record_applied(filename, (self.clock)())?;
            result.files_applied += 1;
        }

        result.files_considered = new_files;
        Ok(result)
    }

    /// Record every new file without executing it.
    pub fn reset(&self, directory: &Path) -> Result<RunResult> {
        Migrator {
            db: self.db,
            ledger: self.ledger,
            options: MigrateOptions {
                log_only: true,
                ..self.options.clone()
            },
            splitter: self.splitter.clone(),
            clock: self.clock,
        }
        .run(directory)
    }

    fn apply_file(&self, directory: &Path, filename: &str) -> Vec<Failure> {
        let path = directory.join(filename);
        let sql = match std::fs::read_to_string(&path) {
            Ok(sql) => sql,
            Err(e) => {
                let failure = Failure {
                    filename: filename.to_string(),
                    kind: FailureKind::Read {
                        message: e.to_string(),
                    },
                };
                warn!("{failure}");
                return vec![failure];
            }
        };

        let statements = self.splitter.split(&sql);
        info!("applying {filename} ({} statements)", statements.len());

        let mut failures = Vec::new();
        for (index, statement) in statements.into_iter().enumerate() {
            match self.db.execute(&statement) {
                Ok(affected) => debug!("{filename} #{}: {affected} rows", index + 1),
                Err(e) if e.is_benign() => {
                    debug!("{filename} #{}: {e}", index + 1);
                }
                Err(error) => {
                    let failure = Failure {
                        filename: filename.to_string(),
                        kind: FailureKind::Statement {
                            index,
                            statement,
                            error,
                        },
                    };
                    warn!("{failure}");
                    failures.push(failure);
                }
            }
        }
        failures
    }
}

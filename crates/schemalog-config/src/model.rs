use std::fmt;
use std::path::{Path, PathBuf};

use schemalog_common::Result;
use schemalog_sql::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};

use crate::validation::ConfigValidator;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_LEDGER_TABLE: &str = "migration_log";
pub const DEFAULT_SQLITE_PATH: &str = "schemalog.db";

/// Top-level configuration, as read from `schemalog.toml` or `schemalog.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the migration files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub migrate: MigrateOptions,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_database(&self.database)?;
        ConfigValidator::validate_delimiter(&self.migrate.statement_delimiter)?;
        ConfigValidator::validate_identifier(&self.migrate.ledger_table)?;
        Ok(())
    }

    /// Anchor relative paths at `base` (normally the config file's directory).
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if let Some(dir) = &self.directory
            && dir.is_relative()
        {
            self.directory = Some(base.join(dir));
        }
        if let DatabaseConfig::Sqlite { path } = &mut self.database
            && path.is_relative()
            && !is_memory_path(path)
        {
            *path = base.join(&*path);
        }
    }
}

/// Connection parameters, selected by the `driver` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: PathBuf },
    Mysql(MysqlParams),
}

impl DatabaseConfig {
    pub fn driver(&self) -> &'static str {
        match self {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Mysql(_) => "mysql",
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Sqlite {
            path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

pub fn is_memory_path(path: &Path) -> bool {
    path.as_os_str() == ":memory:"
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysqlParams {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

impl MysqlParams {
    /// The configured port, falling back to 3306 when unset (0).
    pub fn port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_MYSQL_PORT
        } else {
            self.port
        }
    }
}

impl fmt::Debug for MysqlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlParams")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Knobs for a single migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// Record new files in the ledger without executing them.
    pub log_only: bool,

    pub statement_delimiter: String,

    /// Record a file as applied even when one of its statements failed or
    /// the file could not be read. Turning this off leaves such files
    /// pending so the next run retries them.
    pub mark_applied_on_failure: bool,

    pub ledger_table: String,
}

impl MigrateOptions {
    pub fn log_only() -> Self {
        Self {
            log_only: true,
            ..Self::default()
        }
    }
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            log_only: false,
            statement_delimiter: DEFAULT_DELIMITER.to_string(),
            mark_applied_on_failure: true,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_options_defaults() {
        let opts = MigrateOptions::default();
        assert!(!opts.log_only);
        assert_eq!(opts.statement_delimiter, ";");
        assert!(opts.mark_applied_on_failure);
        assert_eq!(opts.ledger_table, "migration_log");
        assert!(MigrateOptions::log_only().log_only);
    }

    #[test]
    fn mysql_port_falls_back_to_default() {
        let params = MysqlParams {
            host: "db".into(),
            port: 0,
            username: "root".into(),
            password: String::new(),
            database: "app".into(),
        };
        assert_eq!(params.port(), 3306);
    }

    #[test]
    fn debug_output_hides_password() {
        let params = MysqlParams {
            host: "db".into(),
            port: 3307,
            username: "root".into(),
            password: "hunter2".into(),
            database: "app".into(),
        };
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("3307"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let mut config = AppConfig {
            directory: Some(PathBuf::from("migrations")),
            database: DatabaseConfig::Sqlite {
                path: PathBuf::from("app.db"),
            },
            migrate: MigrateOptions::default(),
        };
        config.resolve_relative_to(Path::new("/srv/app"));
        assert_eq!(config.directory, Some(PathBuf::from("/srv/app/migrations")));
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("/srv/app/app.db")
            }
        );
    }

    #[test]
    fn memory_path_is_not_resolved() {
        let mut config = AppConfig {
            directory: None,
            database: DatabaseConfig::Sqlite {
                path: PathBuf::from(":memory:"),
            },
            migrate: MigrateOptions::default(),
        };
        config.resolve_relative_to(Path::new("/srv/app"));
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from(":memory:")
            }
        );
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use schemalog_config::model::DEFAULT_SQLITE_PATH;
use schemalog_config::{AppConfig, ConfigLoader, DEFAULT_MYSQL_PORT, DatabaseConfig, MysqlParams};

use crate::logging::LogFormat;

/// Directory used when neither the config nor `--dir` names one.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// schemalog - apply SQL migration files exactly once
#[derive(Parser, Debug)]
#[command(name = "schemalog", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (.toml, .yml or .yaml); defaults to ./schemalog.toml if present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the migration files
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// Database driver
    #[arg(long, global = true, value_enum)]
    pub driver: Option<Driver>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// MySQL host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// MySQL port [default: 3306]
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// MySQL user
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// MySQL password
    #[arg(long, global = true, env = "SCHEMALOG_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MySQL database name
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Statement delimiter used to split migration files
    #[arg(long, global = true)]
    pub delimiter: Option<String>,

    /// Name of the table recording applied files
    #[arg(long, global = true)]
    pub ledger_table: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Driver {
    Sqlite,
    Mysql,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every migration file not yet recorded in the ledger
    Migrate {
        /// List pending files without executing or recording them
        #[arg(long)]
        dry_run: bool,
        /// Leave files with failed statements pending so the next run retries them
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record every new file as applied without executing it
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show applied and pending migration files
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a config file interactively
    Init {
        /// Where to write the config
        #[arg(default_value = "schemalog.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl GlobalArgs {
    /// Merge the config file (if any) with command-line overrides.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ConfigLoader::discover(Path::new("."))?.unwrap_or_default(),
        };

        if let Some(dir) = &self.dir {
            config.directory = Some(dir.clone());
        }

        let driver = self.driver.unwrap_or(match config.database {
            DatabaseConfig::Sqlite { .. } => Driver::Sqlite,
            DatabaseConfig::Mysql(_) => Driver::Mysql,
        });

        config.database = match (driver, config.database) {
            (Driver::Sqlite, DatabaseConfig::Sqlite { path }) => DatabaseConfig::Sqlite {
                path: self.path.clone().unwrap_or(path),
            },
            (Driver::Sqlite, DatabaseConfig::Mysql(_)) => DatabaseConfig::Sqlite {
                path: self
                    .path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH)),
            },
            (Driver::Mysql, existing) => {
                let mut params = match existing {
                    DatabaseConfig::Mysql(params) => params,
                    DatabaseConfig::Sqlite { .. } => MysqlParams {
                        host: "localhost".to_string(),
                        port: DEFAULT_MYSQL_PORT,
                        username: String::new(),
                        password: String::new(),
                        database: String::new(),
                    },
                };
                self.apply_mysql_overrides(&mut params);
                DatabaseConfig::Mysql(params)
            }
        };

        if let Some(delimiter) = &self.delimiter {
            config.migrate.statement_delimiter = delimiter.clone();
        }
        if let Some(table) = &self.ledger_table {
            config.migrate.ledger_table = table.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_mysql_overrides(&self, params: &mut MysqlParams) {
        if let Some(host) = &self.host {
            params.host = host.clone();
        }
        if let Some(port) = self.port {
            params.port = port;
        }
        if let Some(user) = &self.user {
            params.username = user.clone();
        }
        if let Some(password) = &self.password {
            params.password = password.clone();
        }
        if let Some(database) = &self.database {
            params.database = database.clone();
        }
    }
}

/// The migrations directory a resolved config points at.
pub fn migrations_dir(config: &AppConfig) -> PathBuf {
    config
        .directory
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATIONS_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_migrate_flags() {
        let cli = parse(&["schemalog", "migrate", "--strict", "--dir", "db/migrations"]);
        match cli.command {
            Commands::Migrate {
                dry_run,
                strict,
                json,
            } => {
                assert!(!dry_run);
                assert!(strict);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.global.dir, Some(PathBuf::from("db/migrations")));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["schemalog", "status", "--json", "-vv", "--log-format", "json"]);
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Status { json: true }));
    }

    #[test]
    fn init_defaults_output_path() {
        let cli = parse(&["schemalog", "init"]);
        match cli.command {
            Commands::Init { output, force } => {
                assert_eq!(output, PathBuf::from("schemalog.toml"));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn mysql_flags_build_connection_params() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("schemalog.toml");
        std::fs::write(&config_path, "").unwrap();

        let args = GlobalArgs {
            config: Some(config_path),
            driver: Some(Driver::Mysql),
            host: Some("db.internal".into()),
            user: Some("deploy".into()),
            password: Some("pw".into()),
            database: Some("shop".into()),
            ..GlobalArgs::default()
        };
        let config = args.resolve_config().unwrap();
        match config.database {
            DatabaseConfig::Mysql(params) => {
                assert_eq!(params.host, "db.internal");
                assert_eq!(params.port(), 3306);
                assert_eq!(params.username, "deploy");
                assert_eq!(params.password, "pw");
                assert_eq!(params.database, "shop");
            }
            other => panic!("expected mysql, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("schemalog.toml");
        std::fs::write(
            &config_path,
            "directory = \"sql\"\n[database]\ndriver = \"sqlite\"\npath = \"file.db\"\n[migrate]\nledger_table = \"history\"\n",
        )
        .unwrap();

        let args = GlobalArgs {
            config: Some(config_path),
            path: Some(PathBuf::from("override.db")),
            delimiter: Some("$$".into()),
            ..GlobalArgs::default()
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(migrations_dir(&config), dir.path().join("sql"));
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("override.db")
            }
        );
        assert_eq!(config.migrate.statement_delimiter, "$$");
        assert_eq!(config.migrate.ledger_table, "history");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("schemalog.toml");
        std::fs::write(&config_path, "").unwrap();

        let args = GlobalArgs {
            config: Some(config_path),
            ledger_table: Some("bad name".into()),
            ..GlobalArgs::default()
        };
        assert!(args.resolve_config().is_err());
    }
}

use std::path::Path;

use schemalog_common::{Error, Result};
use tracing::debug;

use crate::model::AppConfig;

/// File names probed, in order, when no config path is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["schemalog.toml", "schemalog.yml", "schemalog.yaml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Ok(ConfigFormat::Toml),
            "yml" | "yaml" => Ok(ConfigFormat::Yaml),
            other => Err(Error::Config(format!(
                "unsupported config extension: '{other}' ({})",
                path.display()
            ))),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a config file. Relative paths inside it are
    /// anchored at the file's own directory.
    pub fn load(path: &Path) -> Result<AppConfig> {
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let mut config = Self::parse(&contents, format)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.validate()?;

        debug!(
            "loaded config from {} (driver = {})",
            path.display(),
            config.database.driver()
        );
        Ok(config)
    }

    /// Look for one of [`DEFAULT_CONFIG_FILES`] in `dir` and load the first hit.
    pub fn discover(dir: &Path) -> Result<Option<AppConfig>> {
        for name in DEFAULT_CONFIG_FILES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
        }
        Ok(None)
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<AppConfig> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}"))),
            ConfigFormat::Yaml => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
        }
    }

    pub fn render(config: &AppConfig, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config)
                .map_err(|e| Error::Config(format!("TOML serialize error: {e}"))),
            ConfigFormat::Yaml => serde_yaml::to_string(config)
                .map_err(|e| Error::Config(format!("YAML serialize error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{DatabaseConfig, MigrateOptions, MysqlParams};

    #[test]
    fn parses_mysql_toml_with_default_port() {
        let toml = r#"
directory = "db/migrations"

[database]
driver = "mysql"
host = "127.0.0.1"
username = "deploy"
password = "secret"
database = "shop"
"#;
        let config = ConfigLoader::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.directory, Some(PathBuf::from("db/migrations")));
        match config.database {
            DatabaseConfig::Mysql(params) => {
                assert_eq!(params.host, "127.0.0.1");
                assert_eq!(params.port(), 3306);
                assert_eq!(params.database, "shop");
            }
            other => panic!("expected mysql config, got {other:?}"),
        }
        assert_eq!(config.migrate, MigrateOptions::default());
    }

    #[test]
    fn parses_yaml_with_options() {
        let yaml = "
database:
  driver: sqlite
  path: app.db
migrate:
  statement_delimiter: \"$$\"
  mark_applied_on_failure: false
";
        let config = ConfigLoader::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("app.db")
            }
        );
        assert_eq!(config.migrate.statement_delimiter, "$$");
        assert!(!config.migrate.mark_applied_on_failure);
        assert_eq!(config.migrate.ledger_table, "migration_log");
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(ConfigFormat::from_path(Path::new("config.ini")).is_err());
        assert_eq!(
            ConfigFormat::from_path(Path::new("a.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn load_resolves_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schemalog.toml");
        std::fs::write(
            &path,
            "directory = \"migrations\"\n[database]\ndriver = \"sqlite\"\npath = \"app.db\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.directory, Some(dir.path().join("migrations")));

        let found = ConfigLoader::discover(dir.path()).unwrap();
        assert_eq!(found, Some(config));
    }

    #[test]
    fn load_rejects_invalid_ledger_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[migrate]\nledger_table = \"x; DROP TABLE y\"\n").unwrap();
        assert!(ConfigLoader::load(&path).is_err());
    }

    #[test]
    fn discover_returns_none_without_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::discover(dir.path()).unwrap().is_none());
    }

    #[test]
    fn rendered_toml_parses_back() {
        let config = AppConfig {
            directory: Some(PathBuf::from("migrations")),
            database: DatabaseConfig::Mysql(MysqlParams {
                host: "db".into(),
                port: 3306,
                username: "root".into(),
                password: String::new(),
                database: "app".into(),
            }),
            migrate: MigrateOptions::default(),
        };
        let rendered = ConfigLoader::render(&config, ConfigFormat::Toml).unwrap();
        let parsed = ConfigLoader::parse(&rendered, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }
}

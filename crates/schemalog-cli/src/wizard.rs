use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, Input, Password, Select};
use schemalog_config::loader::ConfigFormat;
use schemalog_config::model::DEFAULT_SQLITE_PATH;
use schemalog_config::{
    AppConfig, ConfigLoader, DEFAULT_MYSQL_PORT, DatabaseConfig, MigrateOptions, MysqlParams,
};
use tracing::info;

use crate::cli::DEFAULT_MIGRATIONS_DIR;

/// Run the interactive setup wizard and write the resulting config to `output`.
pub fn run_wizard(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            output.display()
        );
    }

    if !std::io::stdin().is_terminal() {
        println!("Non-interactive environment detected.");
        println!("Create {} by hand, for example:", output.display());
        println!("---");
        print!("{}", example_config()?);
        return Ok(());
    }

    println!();
    println!("  schemalog setup");
    println!("  ---------------");
    println!();

    let directory: String = Input::new()
        .with_prompt("Migrations directory")
        .default(DEFAULT_MIGRATIONS_DIR.to_string())
        .interact_text()
        .context("directory input cancelled")?;

    // --- Driver selection ---
    let drivers = &["sqlite", "mysql"];
    let selection = Select::new()
        .with_prompt("Database driver")
        .items(drivers)
        .default(0)
        .interact()
        .context("driver selection cancelled")?;

    let database = match drivers[selection] {
        "mysql" => DatabaseConfig::Mysql(prompt_mysql()?),
        _ => {
            let path: String = Input::new()
                .with_prompt("SQLite database file")
                .default(DEFAULT_SQLITE_PATH.to_string())
                .interact_text()
                .context("path input cancelled")?;
            DatabaseConfig::Sqlite {
                path: PathBuf::from(path),
            }
        }
    };

    let mark_applied_on_failure = Confirm::new()
        .with_prompt("Record a file as applied even if one of its statements fails?")
        .default(true)
        .interact()
        .context("policy choice cancelled")?;

    let config = AppConfig {
        directory: Some(PathBuf::from(directory)),
        database,
        migrate: MigrateOptions {
            mark_applied_on_failure,
            ..MigrateOptions::default()
        },
    };
    config.validate()?;

    let format = ConfigFormat::from_path(output)?;
    let rendered = ConfigLoader::render(&config, format)?;
    std::fs::write(output, &rendered)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!("config written to {}", output.display());
    println!();
    println!("  Config written to {}", output.display());
    println!("  Run `schemalog migrate` to apply pending files.");
    println!();

    Ok(())
}

fn prompt_mysql() -> Result<MysqlParams> {
    let host: String = Input::new()
        .with_prompt("MySQL host")
        .default("localhost".to_string())
        .interact_text()
        .context("host input cancelled")?;
    let port: u16 = Input::new()
        .with_prompt("MySQL port")
        .default(DEFAULT_MYSQL_PORT)
        .interact_text()
        .context("port input cancelled")?;
    let username: String = Input::new()
        .with_prompt("MySQL user")
        .interact_text()
        .context("user input cancelled")?;
    let database: String = Input::new()
        .with_prompt("Database name")
        .interact_text()
        .context("database input cancelled")?;

    let choices = &[
        "Use SCHEMALOG_DB_PASSWORD env var (recommended)",
        "Store as plaintext in the config file",
    ];
    let store = Select::new()
        .with_prompt("How should the password be provided?")
        .items(choices)
        .default(0)
        .interact()
        .context("password choice cancelled")?;

    let password = if store == 1 {
        Password::new()
            .with_prompt("MySQL password")
            .allow_empty_password(true)
            .interact()
            .context("password input cancelled")?
    } else {
        println!("  Set SCHEMALOG_DB_PASSWORD before running schemalog.");
        String::new()
    };

    Ok(MysqlParams {
        host,
        port,
        username,
        password,
        database,
    })
}

fn example_config() -> Result<String> {
    let config = AppConfig {
        directory: Some(PathBuf::from(DEFAULT_MIGRATIONS_DIR)),
        database: DatabaseConfig::Mysql(MysqlParams {
            host: "localhost".to_string(),
            port: DEFAULT_MYSQL_PORT,
            username: "deploy".to_string(),
            password: String::new(),
            database: "app".to_string(),
        }),
        migrate: MigrateOptions::default(),
    };
    Ok(ConfigLoader::render(&config, ConfigFormat::Toml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_is_loadable() {
        let rendered = example_config().unwrap();
        let parsed = ConfigLoader::parse(&rendered, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.database.driver(), "mysql");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("schemalog.toml");
        std::fs::write(&output, "").unwrap();
        assert!(run_wizard(&output, false).is_err());
    }
}

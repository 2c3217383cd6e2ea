//! schemalog CLI - apply SQL migration files exactly once

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use schemalog_config::AppConfig;
use schemalog_db::{Ledger, TableLedger};
use schemalog_engine::Migrator;

mod cli;
mod logging;
mod report;
mod wizard;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.log_format);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { output, force } => {
            wizard::run_wizard(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate {
            dry_run,
            strict,
            json,
        } => {
            let mut config = cli.global.resolve_config()?;
            if strict {
                config.migrate.mark_applied_on_failure = false;
            }
            if dry_run {
                pending(&config, json)
            } else {
                migrate(&config, json)
            }
        }
        Commands::Reset { json } => {
            let mut config = cli.global.resolve_config()?;
            config.migrate.log_only = true;
            migrate(&config, json)
        }
        Commands::Status { json } => status(&cli.global.resolve_config()?, json),
    }
}

fn migrate(config: &AppConfig, json: bool) -> Result<ExitCode> {
    let dir = cli::migrations_dir(config);
    let result = schemalog_engine::start_with(&dir, &config.database, &config.migrate)
        .with_context(|| format!("migration of {} aborted", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report::print_run(&result, config, &dir, config.migrate.log_only);
    }

    Ok(if result.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn pending(config: &AppConfig, json: bool) -> Result<ExitCode> {
    let dir = cli::migrations_dir(config);
    let db = schemalog_db::connect(&config.database)?;
    let ledger = TableLedger::new(db.as_ref(), &config.migrate.ledger_table)?;
    let pending = Migrator::new(db.as_ref(), &ledger, config.migrate.clone()).pending(&dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
    } else {
        report::print_pending(&pending, &dir);
    }
    Ok(ExitCode::SUCCESS)
}

fn status(config: &AppConfig, json: bool) -> Result<ExitCode> {
    let dir = cli::migrations_dir(config);
    let db = schemalog_db::connect(&config.database)?;
    let ledger = TableLedger::new(db.as_ref(), &config.migrate.ledger_table)?;
    let pending = Migrator::new(db.as_ref(), &ledger, config.migrate.clone()).pending(&dir)?;
    let status_report = report::StatusReport {
        applied: ledger.entries()?,
        pending,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status_report)?);
    } else {
        report::print_status(&status_report, config, &dir);
    }
    Ok(ExitCode::SUCCESS)
}

use std::path::Path;

use chrono::DateTime;
use schemalog_config::AppConfig;
use schemalog_db::LedgerEntry;
use schemalog_engine::RunResult;
use serde::Serialize;

const WIDTH: usize = 70;

fn boxed(title: &str, lines: &[String]) {
    let inner = WIDTH - 4;
    let title_dashes = WIDTH.saturating_sub(title.chars().count() + 7);
    println!("╭─── {title} {}╮", "─".repeat(title_dashes));
    for line in lines {
        let shown: String = line.chars().take(inner).collect();
        println!("│ {shown:<inner$} │");
    }
    println!("╰{}╯", "─".repeat(WIDTH - 2));
}

fn target(config: &AppConfig) -> String {
    match &config.database {
        schemalog_config::DatabaseConfig::Sqlite { path } => format!("sqlite  {}", path.display()),
        schemalog_config::DatabaseConfig::Mysql(p) => {
            format!("mysql   {}@{}:{}/{}", p.username, p.host, p.port(), p.database)
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Print the outcome of a `migrate` or `reset` run.
pub fn print_run(result: &RunResult, config: &AppConfig, dir: &Path, log_only: bool) {
    let mut lines = vec![
        format!("Directory   {}", dir.display()),
        format!("Database    {}", target(config)),
        format!("Mode        {}", if log_only { "log only" } else { "execute" }),
        String::new(),
    ];

    if result.files_considered.is_empty() {
        lines.push("Nothing to do.".to_string());
    }
    for file in &result.files_considered {
        let failed = result.failures.iter().any(|f| &f.filename == file);
        let mark = if failed { "!" } else { "✓" };
        lines.push(format!("{mark} {file}"));
    }
    for failure in &result.failures {
        lines.push(format!("  {failure}"));
    }
    lines.push(String::new());
    lines.push(result.summary());

    boxed("schemalog", &lines);
}

pub fn print_pending(pending: &[String], dir: &Path) {
    let mut lines = vec![format!("Directory   {}", dir.display()), String::new()];
    if pending.is_empty() {
        lines.push("No pending files.".to_string());
    }
    lines.extend(pending.iter().map(|f| format!("· {f}")));
    lines.push(String::new());
    lines.push(format!(
        "{} pending file{}",
        pending.len(),
        if pending.len() == 1 { "" } else { "s" }
    ));
    boxed("dry run", &lines);
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub applied: Vec<LedgerEntry>,
    pub pending: Vec<String>,
}

pub fn print_status(report: &StatusReport, config: &AppConfig, dir: &Path) {
    let mut lines = vec![
        format!("Directory   {}", dir.display()),
        format!("Database    {}", target(config)),
        format!("Ledger      {}", config.migrate.ledger_table),
        String::new(),
        format!("Applied ({})", report.applied.len()),
    ];
    lines.extend(
        report
            .applied
            .iter()
            .map(|e| format!("  {}  {}", format_timestamp(e.applied_at), e.filename)),
    );
    lines.push(String::new());
    lines.push(format!("Pending ({})", report.pending.len()));
    lines.extend(report.pending.iter().map(|f| format!("  {f}")));

    boxed("status", &lines);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(1_704_067_200), "2024-01-01 00:00:00 UTC");
    }

    #[test]
    fn status_report_serializes() {
        let report = StatusReport {
            applied: vec![LedgerEntry {
                id: 1,
                filename: "001.sql".into(),
                applied_at: 5,
            }],
            pending: vec!["002.sql".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["applied"][0]["filename"], "001.sql");
        assert_eq!(json["pending"][0], "002.sql");
    }
}

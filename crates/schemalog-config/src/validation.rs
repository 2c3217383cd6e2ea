use schemalog_common::{Error, Result};

use crate::model::DatabaseConfig;

/// Longest identifier accepted for the ledger table (MySQL's limit).
const MAX_IDENTIFIER_LEN: usize = 64;

/// Markers stripped as comments before splitting.
const COMMENT_OPENERS: [&str; 3] = ["--", "#", "/*"];

/// Validation for values that end up spliced into SQL text or drive the splitter.
pub struct ConfigValidator;

impl ConfigValidator {
    /// The ledger table name is interpolated into DDL, so only plain
    /// identifiers are accepted.
    pub fn validate_identifier(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Config("ledger table name cannot be empty".into()));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::Config(format!(
                "ledger table name too long ({} > {MAX_IDENTIFIER_LEN})",
                name.len()
            )));
        }
        let mut chars = name.chars();
        let starts_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!(
                "ledger table name '{name}' must match [A-Za-z_][A-Za-z0-9_]*"
            )));
        }
        Ok(())
    }

    /// A delimiter must be non-empty and must not collide with quoting,
    /// whitespace or comment markers. Comments are removed before splitting,
    /// so a delimiter containing a comment opener would never be seen.
    pub fn validate_delimiter(delimiter: &str) -> Result<()> {
        if delimiter.is_empty() {
            return Err(Error::Config("statement delimiter cannot be empty".into()));
        }
        if delimiter
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '`'))
        {
            return Err(Error::Config(format!(
                "statement delimiter '{delimiter}' may not contain quotes or whitespace"
            )));
        }
        if let Some(opener) = COMMENT_OPENERS.iter().find(|o| delimiter.contains(*o)) {
            return Err(Error::Config(format!(
                "statement delimiter '{delimiter}' may not contain the comment marker '{opener}'"
            )));
        }
        Ok(())
    }

    pub fn validate_database(database: &DatabaseConfig) -> Result<()> {
        match database {
            DatabaseConfig::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::Config("sqlite path cannot be empty".into()));
                }
            }
            DatabaseConfig::Mysql(params) => {
                if params.host.trim().is_empty() {
                    return Err(Error::Config("mysql host cannot be empty".into()));
                }
                if params.username.trim().is_empty() {
                    return Err(Error::Config("mysql username cannot be empty".into()));
                }
                if params.database.trim().is_empty() {
                    return Err(Error::Config("mysql database cannot be empty".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::ConfigValidator;
    use crate::model::{DatabaseConfig, MysqlParams};

    #[test]
    fn accepts_plain_identifiers() {
        assert!(ConfigValidator::validate_identifier("migration_log").is_ok());
        assert!(ConfigValidator::validate_identifier("_schema2").is_ok());
    }

    #[test]
    fn rejects_identifiers_that_could_inject_sql() {
        assert!(ConfigValidator::validate_identifier("").is_err());
        assert!(ConfigValidator::validate_identifier("1log").is_err());
        assert!(ConfigValidator::validate_identifier("log; DROP TABLE x").is_err());
        assert!(ConfigValidator::validate_identifier("a-b").is_err());

        let too_long = "a".repeat(65);
        assert!(ConfigValidator::validate_identifier(&too_long).is_err());
    }

    #[test]
    fn validates_delimiters() {
        assert!(ConfigValidator::validate_delimiter(";").is_ok());
        assert!(ConfigValidator::validate_delimiter("$$").is_ok());
        assert!(ConfigValidator::validate_delimiter("").is_err());
        assert!(ConfigValidator::validate_delimiter("'").is_err());
        assert!(ConfigValidator::validate_delimiter("; ").is_err());
    }

    #[test]
    fn rejects_delimiters_containing_comment_markers() {
        for delimiter in ["#", "--", "/*", ";--", "$#$"] {
            assert!(
                ConfigValidator::validate_delimiter(delimiter).is_err(),
                "{delimiter} should be rejected"
            );
        }
        assert!(ConfigValidator::validate_delimiter("//").is_ok());
        assert!(ConfigValidator::validate_delimiter("-").is_ok());
    }

    #[test]
    fn validates_database_settings() {
        let sqlite = DatabaseConfig::Sqlite {
            path: PathBuf::new(),
        };
        assert!(ConfigValidator::validate_database(&sqlite).is_err());

        let mysql = DatabaseConfig::Mysql(MysqlParams {
            host: "localhost".into(),
            port: 3306,
            username: "root".into(),
            password: String::new(),
            database: String::new(),
        });
        assert!(ConfigValidator::validate_database(&mysql).is_err());
    }
}

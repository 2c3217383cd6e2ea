use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    /// The migration directory is missing or unreadable. Fatal for a run.
    #[error("directory access error: {0}")]
    DirectoryAccess(String),

    /// The database handle could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The ledger's create-if-missing statement failed.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display_includes_context() {
        let e = Error::Config("bad toml".into());
        assert_eq!(e.to_string(), "configuration error: bad toml");

        let e = Error::DirectoryAccess("/nope: not found".into());
        assert_eq!(e.to_string(), "directory access error: /nope: not found");

        let e = Error::Schema("table locked".into());
        assert_eq!(e.to_string(), "schema error: table locked");

        let e = Error::Database("insert rejected".into());
        assert_eq!(e.to_string(), "database error: insert rejected");
    }
}

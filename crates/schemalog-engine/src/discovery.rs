use std::fs;
use std::path::Path;

use schemalog_common::{Error, Result};
use tracing::{debug, warn};

/// List the migration candidates in `directory`, sorted ascending by name.
///
/// Subdirectories (including symlinks to directories) are skipped. Names
/// that are not valid UTF-8 cannot be stored in the ledger and are skipped
/// with a warning.
pub fn list_files(directory: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(directory).map_err(|e| {
        Error::DirectoryAccess(format!(
            "failed to read migrations directory {}: {e}",
            directory.display()
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::DirectoryAccess(format!(
                "failed to read entry in {}: {e}",
                directory.display()
            ))
        })?;

        if entry.path().is_dir() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(raw) => warn!("skipping non UTF-8 filename {raw:?}"),
        }
    }

    files.sort();
    debug!("found {} files in {}", files.len(), directory.display());
    Ok(files)
}

pub mod splitter;

pub use splitter::{DEFAULT_DELIMITER, StatementSplitter, remove_comments, split_statements};

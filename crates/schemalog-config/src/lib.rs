pub mod loader;
pub mod model;
pub mod validation;

pub use loader::ConfigLoader;
pub use model::{AppConfig, DEFAULT_MYSQL_PORT, DatabaseConfig, MigrateOptions, MysqlParams};

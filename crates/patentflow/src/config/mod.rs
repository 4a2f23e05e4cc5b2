pub mod loader;
pub mod schema;

pub use loader::{cache_dir, database_path, load_config, load_config_from_str};
pub use schema::{
    BackoffConfig, BulkConfig, ColumnConfig, Config, DatabaseConfig, ExtractionConfig,
    FuzzyStrategy, MatchConfig, ProviderConfig,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatentflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bulk index error: {0}")]
    Index(#[from] IndexError),

    #[error("Provider chain error: {0}")]
    Chain(#[from] crate::provider::ChainError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crate::extract::ExtractError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid provider '{name}': {reason}")]
    InvalidProvider { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum IndexError {
    /// The archive could not be fetched, cached or opened, or no index
    /// generation has been loaded yet.
    #[error("Bulk source unavailable ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// A row failed validation. Counted and skipped during loads.
    #[error("Corrupt row {row}: {reason}")]
    CorruptData { row: u64, reason: String },

    #[error("Required column '{0}' missing from dataset header")]
    MissingColumn(String),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Load task failed: {0}")]
    Task(String),
}

impl IndexError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        IndexError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PatentflowError>;

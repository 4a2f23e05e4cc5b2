use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.bulk.chunk_size == 0 {
        return Err(ConfigError::Validation {
            message: "bulk.chunk_size must be greater than zero".to_string(),
        });
    }

    if !config.bulk.delimiter.is_ascii() {
        return Err(ConfigError::Validation {
            message: format!(
                "bulk.delimiter must be a single ASCII character, got '{}'",
                config.bulk.delimiter
            ),
        });
    }

    let threshold = config.matching.threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::Validation {
            message: format!("matching.threshold must be in (0, 1], got {}", threshold),
        });
    }

    if config.extraction.worker_count == 0 || config.extraction.company_concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "extraction worker counts must be greater than zero".to_string(),
        });
    }

    let mut kinds = HashSet::new();
    for provider in &config.providers {
        if !kinds.insert(provider.kind) {
            return Err(ConfigError::InvalidProvider {
                name: provider.kind.to_string(),
                reason: "Duplicate provider kind".to_string(),
            });
        }
        if provider.backoff.base_ms > provider.backoff.max_ms {
            return Err(ConfigError::InvalidProvider {
                name: provider.kind.to_string(),
                reason: "backoff.base_ms exceeds backoff.max_ms".to_string(),
            });
        }
    }

    if !config.providers.iter().any(|p| p.enabled) {
        return Err(ConfigError::Validation {
            message: "At least one provider must be enabled".to_string(),
        });
    }

    Ok(())
}

/// Resolved database path: configured value or the per-user default.
pub fn database_path(config: &Config) -> Option<PathBuf> {
    match &config.database.path {
        Some(path) => Some(PathBuf::from(path)),
        None => crate::db::default_database_path(),
    }
}

/// Resolved bulk cache directory: configured value or `~/.patentflow/cache/bulk`.
pub fn cache_dir(config: &Config) -> Option<PathBuf> {
    match &config.bulk.cache_dir {
        Some(dir) => Some(PathBuf::from(dir)),
        None => dirs::home_dir().map(|h| h.join(".patentflow").join("cache").join("bulk")),
    }
}

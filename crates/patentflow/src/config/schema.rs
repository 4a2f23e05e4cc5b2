use serde::{Deserialize, Serialize};

use crate::model::DataSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub bulk: BulkConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Defaults to `~/.patentflow/data/patentflow.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// `http(s)://` URL or local path of the archive.
    pub archive_url: String,
    /// Content version marker; a new value forces a re-download and a new
    /// index generation.
    pub archive_version: String,
    /// Defaults to `~/.patentflow/cache/bulk`.
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub columns: ColumnConfig,
}

fn default_chunk_size() -> usize {
    50_000
}

fn default_delimiter() -> char {
    '\t'
}

/// Header names of the columns the loader reads. Other columns are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_patent_id_column")]
    pub patent_id: String,
    #[serde(default = "default_assignee_id_column")]
    pub assignee_id: String,
    #[serde(default = "default_name_column")]
    pub name: String,
}

fn default_patent_id_column() -> String {
    "patent_id".to_string()
}

fn default_assignee_id_column() -> String {
    "assignee_id".to_string()
}

fn default_name_column() -> String {
    "disambig_assignee_organization".to_string()
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            patent_id: default_patent_id_column(),
            assignee_id: default_assignee_id_column(),
            name: default_name_column(),
        }
    }
}

/// Similarity measure used when no variant matches exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyStrategy {
    /// Jaccard overlap of word tokens.
    TokenSet,
    /// Jaro-Winkler similarity of the whole normalized string.
    JaroWinkler,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_strategy")]
    pub strategy: FuzzyStrategy,
    /// Minimum similarity in `(0, 1]` for a candidate to count as a match.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Best-scoring names kept per variant after ranking.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_strategy() -> FuzzyStrategy {
    FuzzyStrategy::TokenSet
}

fn default_threshold() -> f64 {
    0.5
}

fn default_max_candidates() -> usize {
    200
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            threshold: default_threshold(),
            max_candidates: default_max_candidates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: DataSource,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the provider's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Minimum spacing between two calls to this provider, across all workers.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_min_interval_ms() -> u64 {
    1_000
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Concurrent identifiers per company run.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Concurrent company runs in a batch.
    #[serde(default = "default_company_concurrency")]
    pub company_concurrency: usize,
    /// Write attempts per record before the identifier is reported as failed.
    #[serde(default = "default_persistence_retries")]
    pub persistence_retries: u32,
    /// Re-send records held from a lower-priority source through the chain.
    #[serde(default = "default_true")]
    pub upgrade_fallback_sources: bool,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_company_concurrency() -> usize {
    2
}

fn default_persistence_retries() -> u32 {
    3
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            company_concurrency: default_company_concurrency(),
            persistence_retries: default_persistence_retries(),
            upgrade_fallback_sources: true,
        }
    }
}

pub mod bulk;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod sanitize;
pub mod secrets;

pub use bulk::{ArchiveCache, ArchiveSource, BulkIndex, IndexStatus, LoadStats};
pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, IndexError, PatentflowError, Result};
pub use extract::{
    CancelFlag, CompanyOutcome, CompanyRequest, ExtractError, ExtractionResult, Extractor,
    ModeRequest, RunState,
};
pub use logging::{init_logging, LogFormat};
pub use model::{
    CompanyTrackingState, DataSource, ExtractionMode, FullText, PatentRecord, PatentStatus,
};
pub use provider::{build_chain, ChainError, FetchOutcome, FullTextProvider, ProviderChain};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};

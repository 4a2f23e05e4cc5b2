//! Full-text providers and the priority chain that drives them.
//!
//! Every provider answers `fetch(patent_id)` with one [`FetchOutcome`];
//! the [`ProviderChain`] owns ordering, rate limiting and throttling policy
//! so providers stay thin HTTP adapters.

pub mod api;
pub mod backoff;
pub mod chain;
pub mod error;
pub mod http;
pub mod rate_limit;
pub mod registry;
pub mod scrape;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Config, ProviderConfig};
use crate::model::{DataSource, FullText, PatentMetadata};

pub use chain::{ChainAttempt, ChainEntry, ProviderChain, ProviderStats, Resolution, Resolved};
pub use error::{ChainError, ProviderError};

/// A successful fetch: bibliographic data plus the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPatent {
    pub metadata: PatentMetadata,
    pub full_text: FullText,
}

/// The single result type every provider returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Box<FetchedPatent>),
    NotFound,
    /// The provider asked the caller to slow down, optionally saying for how long.
    Throttled { retry_after: Option<Duration> },
    Error(String),
}

impl FetchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            FetchOutcome::Found(_) => OutcomeKind::Found,
            FetchOutcome::NotFound => OutcomeKind::NotFound,
            FetchOutcome::Throttled { .. } => OutcomeKind::Throttled,
            FetchOutcome::Error(_) => OutcomeKind::Error,
        }
    }
}

/// Outcome tag recorded in attempt traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    NotFound,
    Throttled,
    Error,
}

#[async_trait]
pub trait FullTextProvider: Send + Sync {
    fn source(&self) -> DataSource;

    async fn fetch(&self, patent_id: &str) -> FetchOutcome;
}

/// Builds the HTTP provider for one config entry.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn FullTextProvider>, ProviderError> {
    let provider: Arc<dyn FullTextProvider> = match config.kind {
        DataSource::Api => Arc::new(api::PatentsViewProvider::from_config(config)?),
        DataSource::Scrape => Arc::new(scrape::GooglePatentsProvider::from_config(config)?),
        DataSource::Registry => Arc::new(registry::RegistryProvider::from_config(config)?),
    };
    Ok(provider)
}

/// Builds the chain from the enabled providers in `config`.
pub fn build_chain(config: &Config) -> Result<ProviderChain, ChainError> {
    let mut entries = Vec::new();
    for provider_config in config.providers.iter().filter(|p| p.enabled) {
        let provider = build_provider(provider_config)?;
        entries.push(ChainEntry::from_config(provider, provider_config));
    }
    ProviderChain::new(entries)
}

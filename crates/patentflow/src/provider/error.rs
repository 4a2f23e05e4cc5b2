//! Provider construction and chain configuration errors.
//!
//! Fetch failures are not errors at this level: they travel as
//! [`FetchOutcome`](super::FetchOutcome) values through the chain.

use thiserror::Error;

use crate::model::DataSource;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to build HTTP client for '{provider}': {source}")]
    Client {
        provider: DataSource,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to resolve API key for '{provider}': {source}")]
    Credential {
        provider: DataSource,
        #[source]
        source: SecretError,
    },

    #[error("Provider '{0}' requires an API key")]
    MissingCredential(DataSource),
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Provider chain is empty")]
    NoProviders,

    #[error("Provider '{0}' appears more than once in the chain")]
    DuplicateProvider(DataSource),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::IndexError;
use crate::provider::ChainError;

use super::state::RunState;

/// Errors that abort a run. The run ends in [`RunState::Failed`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Bulk index unavailable: {0}")]
    IndexUnavailable(#[source] IndexError),

    #[error("Provider chain misconfigured: {0}")]
    Configuration(#[from] ChainError),

    #[error("Database unavailable during {state}: {source}")]
    Database {
        state: RunState,
        #[source]
        source: DatabaseError,
    },
}

impl ExtractError {
    pub(crate) fn database(state: RunState, source: DatabaseError) -> Self {
        ExtractError::Database { state, source }
    }
}

/// One identifier that could not be persisted. The run carries on without it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IdentifierError {
    pub patent_id: String,
    pub message: String,
}

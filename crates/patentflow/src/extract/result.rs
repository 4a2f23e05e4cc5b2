use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::ExtractionMode;

use super::error::IdentifierError;
use super::state::RunState;

/// Summary of one company run that reached FINALIZE.
///
/// Every identifier in `patents_found` lands in exactly one of
/// `patents_enriched`, `patents_unresolved`, `errors` or `skipped_known`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Correlates the result with the run's log lines.
    pub run_id: String,
    pub company_key: String,
    pub mode: ExtractionMode,
    pub final_state: RunState,
    pub states: Vec<RunState>,
    /// Identifiers discovered in the index, plus unsettled ones re-checked
    /// by an incremental run.
    pub patents_found: BTreeSet<String>,
    /// Processed identifiers holding full text after the run.
    pub patents_enriched: BTreeSet<String>,
    /// Processed identifiers still lacking full text, including any left
    /// undispatched by cancellation.
    pub patents_unresolved: BTreeSet<String>,
    pub errors: Vec<IdentifierError>,
    /// Known identifiers with nothing left to improve.
    pub skipped_known: BTreeSet<String>,
    /// Provider calls made by this run.
    pub chain_attempts: u64,
    pub cancelled: bool,
    /// Records held for the company, as written to its tracking state.
    pub patent_count: u32,
}

impl ExtractionResult {
    /// True when nothing was left unresolved, failed or cancelled.
    pub fn is_complete(&self) -> bool {
        self.patents_unresolved.is_empty() && self.errors.is_empty() && !self.cancelled
    }
}

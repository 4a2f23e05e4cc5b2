use std::collections::BTreeSet;

use crate::model::ExtractionMode;

use super::error::IdentifierError;
use super::result::ExtractionResult;
use super::state::StateTrail;

/// An identifier headed for the provider chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub patent_id: String,
    /// Ignore any cached full text. Set for records still pending a grant
    /// decision, whose bibliographic data may have changed.
    pub force_refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Enriched,
    Unresolved,
    /// Never dispatched because the run was cancelled.
    Undispatched,
    Failed(String),
}

/// How one candidate ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub patent_id: String,
    pub settlement: Settlement,
    pub attempts: usize,
}

pub struct RunContext {
    // Input
    pub run_id: String,
    pub company_key: String,
    pub name_variants: Vec<String>,

    pub trail: StateTrail,

    // DISCOVER result
    pub found: BTreeSet<String>,

    // DEDUP results
    pub candidates: Vec<Candidate>,
    pub skipped_known: BTreeSet<String>,

    // ENRICH results
    pub enriched: BTreeSet<String>,
    pub unresolved: BTreeSet<String>,
    pub errors: Vec<IdentifierError>,
    pub chain_attempts: u64,

    // FINALIZE result
    pub patent_count: u32,

    pub cancelled: bool,
}

impl RunContext {
    pub fn new(run_id: &str, company_key: &str, name_variants: &[String]) -> Self {
        Self {
            run_id: run_id.to_string(),
            company_key: company_key.to_string(),
            name_variants: name_variants.to_vec(),
            trail: StateTrail::new(),
            found: BTreeSet::new(),
            candidates: Vec::new(),
            skipped_known: BTreeSet::new(),
            enriched: BTreeSet::new(),
            unresolved: BTreeSet::new(),
            errors: Vec::new(),
            chain_attempts: 0,
            patent_count: 0,
            cancelled: false,
        }
    }

    pub fn record(&mut self, settled: Settled) {
        self.chain_attempts += settled.attempts as u64;
        match settled.settlement {
            Settlement::Enriched => {
                self.enriched.insert(settled.patent_id);
            }
            Settlement::Unresolved => {
                self.unresolved.insert(settled.patent_id);
            }
            Settlement::Undispatched => {
                self.cancelled = true;
                self.unresolved.insert(settled.patent_id);
            }
            Settlement::Failed(message) => self.errors.push(IdentifierError {
                patent_id: settled.patent_id,
                message,
            }),
        }
    }

    pub fn into_result(self, mode: ExtractionMode) -> ExtractionResult {
        let final_state = self.trail.current();
        let mut errors = self.errors;
        errors.sort_by(|a, b| a.patent_id.cmp(&b.patent_id));

        ExtractionResult {
            run_id: self.run_id,
            company_key: self.company_key,
            mode,
            final_state,
            states: self.trail.into_states(),
            patents_found: self.found,
            patents_enriched: self.enriched,
            patents_unresolved: self.unresolved,
            errors,
            skipped_known: self.skipped_known,
            chain_attempts: self.chain_attempts,
            cancelled: self.cancelled,
            patent_count: self.patent_count,
        }
    }
}

//! Per-company extraction runs.
//!
//! A run walks `START → MODE_SELECT → INITIAL|INCREMENTAL → DISCOVER →
//! DEDUP → ENRICH → FINALIZE → DONE`. Only an unavailable bulk index, a
//! misconfigured chain or an unusable database sends it to `FAILED`;
//! per-identifier problems are reported in the [`ExtractionResult`].

pub mod cancel;
pub mod context;
pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod resolver;
pub mod result;
pub mod state;

pub use cancel::CancelFlag;
pub use error::{ExtractError, IdentifierError};
pub use mode::ModeRequest;
pub use orchestrator::{CompanyOutcome, CompanyRequest, Extractor};
pub use resolver::{Discovery, NameResolver};
pub use result::ExtractionResult;
pub use state::{RunState, StateTrail};

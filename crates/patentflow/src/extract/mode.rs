use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{CompanyTrackingState, ExtractionMode};

/// Mode asked for by the caller of an extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeRequest {
    /// Incremental when the company has been extracted before, initial otherwise.
    #[default]
    Auto,
    ForceInitial,
    ForceIncremental,
}

impl ModeRequest {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeRequest::Auto => "auto",
            ModeRequest::ForceInitial => "force_initial",
            ModeRequest::ForceIncremental => "force_incremental",
        }
    }

    /// Picks the mode for a company given its tracking state, if any.
    pub fn select(self, tracking: Option<&CompanyTrackingState>) -> ExtractionMode {
        match self {
            ModeRequest::ForceInitial => ExtractionMode::Initial,
            ModeRequest::ForceIncremental => ExtractionMode::Incremental,
            ModeRequest::Auto if tracking.is_some() => ExtractionMode::Incremental,
            ModeRequest::Auto => ExtractionMode::Initial,
        }
    }
}

impl fmt::Display for ModeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(ModeRequest::Auto),
            "force_initial" | "initial" => Ok(ModeRequest::ForceInitial),
            "force_incremental" | "incremental" => Ok(ModeRequest::ForceIncremental),
            other => Err(format!("unknown mode request '{}'", other)),
        }
    }
}

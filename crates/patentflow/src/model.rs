//! Domain records shared by the index, the provider chain and the orchestrator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row of the bulk assignee dataset after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeRecord {
    pub assignee_id: String,
    pub raw_name: String,
    pub normalized_name: String,
    pub patent_id: String,
    /// Number of patents held by `assignee_id` in the same generation.
    pub patent_count: u32,
}

/// Legal status of a patent as last reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatentStatus {
    Granted,
    Pending,
    Expired,
    Unknown,
}

impl PatentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatentStatus::Granted => "granted",
            PatentStatus::Pending => "pending",
            PatentStatus::Expired => "expired",
            PatentStatus::Unknown => "unknown",
        }
    }

    /// Maps free-form provider wording ("Active", "Application filed", ...) onto a status.
    pub fn from_provider_text(text: &str) -> Self {
        let lower = text.trim().to_ascii_lowercase();
        if lower.contains("expired") || lower.contains("lapsed") || lower.contains("abandon") {
            PatentStatus::Expired
        } else if lower.contains("pending") || lower.contains("application") {
            PatentStatus::Pending
        } else if lower.contains("grant")
            || lower.contains("active")
            || lower.contains("issued")
            || lower.contains("patented")
        {
            PatentStatus::Granted
        } else {
            PatentStatus::Unknown
        }
    }
}

impl fmt::Display for PatentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "granted" => Ok(PatentStatus::Granted),
            "pending" => Ok(PatentStatus::Pending),
            "expired" => Ok(PatentStatus::Expired),
            "unknown" => Ok(PatentStatus::Unknown),
            other => Err(format!("unknown patent status '{}'", other)),
        }
    }
}

/// Where a full text came from. Declaration order is trust order: lower rank wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Authenticated search API. Fast, quota limited.
    Api,
    /// Scraped public web pages. Slow, rate limited.
    Scrape,
    /// Official registry API. Narrow coverage.
    Registry,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Api => "api",
            DataSource::Scrape => "scrape",
            DataSource::Registry => "registry",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            DataSource::Api => 0,
            DataSource::Scrape => 1,
            DataSource::Registry => 2,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(DataSource::Api),
            "scrape" => Ok(DataSource::Scrape),
            "registry" => Ok(DataSource::Registry),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Bibliographic fields a provider reports next to the full text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatentMetadata {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub grant_date: Option<NaiveDate>,
    pub status: Option<PatentStatus>,
}

/// Claims, description and classifications of one patent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullText {
    pub patent_id: String,
    pub claims_text: String,
    pub description_text: String,
    pub classification_codes: Vec<String>,
    pub data_source: DataSource,
    pub fetched_at: DateTime<Utc>,
}

/// A company's view of one patent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentRecord {
    pub patent_id: String,
    pub company_key: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub grant_date: Option<NaiveDate>,
    pub status: PatentStatus,
    pub source_of_record: Option<DataSource>,
    pub full_text_present: bool,
}

impl PatentRecord {
    /// Record for an identifier no provider could resolve yet.
    pub fn placeholder(company_key: &str, patent_id: &str) -> Self {
        Self {
            patent_id: patent_id.to_string(),
            company_key: company_key.to_string(),
            title: None,
            abstract_text: None,
            filing_date: None,
            grant_date: None,
            status: PatentStatus::Unknown,
            source_of_record: None,
            full_text_present: false,
        }
    }

    /// Record built from a successful provider fetch.
    pub fn enriched(company_key: &str, metadata: &PatentMetadata, full_text: &FullText) -> Self {
        Self {
            patent_id: full_text.patent_id.clone(),
            company_key: company_key.to_string(),
            title: metadata.title.clone(),
            abstract_text: metadata.abstract_text.clone(),
            filing_date: metadata.filing_date,
            grant_date: metadata.grant_date,
            status: metadata
                .status
                .unwrap_or(if metadata.grant_date.is_some() {
                    PatentStatus::Granted
                } else {
                    PatentStatus::Unknown
                }),
            source_of_record: Some(full_text.data_source),
            full_text_present: true,
        }
    }

    /// Whether a later run should send this record through the chain again.
    pub fn needs_refresh(&self, top_source: DataSource) -> bool {
        if !self.full_text_present || self.status == PatentStatus::Pending {
            return true;
        }
        match self.source_of_record {
            Some(source) => source.rank() > top_source.rank(),
            None => true,
        }
    }
}

/// Which pass an extraction run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Initial,
    Incremental,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Initial => "initial",
            ExtractionMode::Incremental => "incremental",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(ExtractionMode::Initial),
            "incremental" => Ok(ExtractionMode::Incremental),
            other => Err(format!("unknown extraction mode '{}'", other)),
        }
    }
}

/// Per-company bookkeeping used to pick the next run's mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyTrackingState {
    pub company_key: String,
    pub last_extraction_at: DateTime<Utc>,
    pub last_patent_count: u32,
    pub extraction_mode_last_used: ExtractionMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_rank_follows_declaration_order() {
        assert!(DataSource::Api < DataSource::Scrape);
        assert!(DataSource::Scrape < DataSource::Registry);
        assert_eq!(DataSource::Api.rank(), 0);
        assert_eq!(DataSource::Registry.rank(), 2);
    }

    #[test]
    fn test_status_from_provider_text() {
        assert_eq!(PatentStatus::from_provider_text("Active"), PatentStatus::Granted);
        assert_eq!(
            PatentStatus::from_provider_text("Expired - Fee Related"),
            PatentStatus::Expired
        );
        assert_eq!(
            PatentStatus::from_provider_text("Application filed"),
            PatentStatus::Pending
        );
        assert_eq!(
            PatentStatus::from_provider_text("Patented Case"),
            PatentStatus::Granted
        );
        assert_eq!(PatentStatus::from_provider_text("???"), PatentStatus::Unknown);
    }

    #[test]
    fn test_needs_refresh() {
        let mut record = PatentRecord::placeholder("grail", "10144962");
        assert!(record.needs_refresh(DataSource::Api));

        record.full_text_present = true;
        record.status = PatentStatus::Granted;
        record.source_of_record = Some(DataSource::Api);
        assert!(!record.needs_refresh(DataSource::Api));

        record.source_of_record = Some(DataSource::Registry);
        assert!(record.needs_refresh(DataSource::Api));
        assert!(!record.needs_refresh(DataSource::Registry));

        record.source_of_record = Some(DataSource::Api);
        record.status = PatentStatus::Pending;
        assert!(record.needs_refresh(DataSource::Api));
    }

    #[test]
    fn test_round_trip_through_str() {
        for mode in [ExtractionMode::Initial, ExtractionMode::Incremental] {
            assert_eq!(mode.as_str().parse::<ExtractionMode>().unwrap(), mode);
        }
        assert!("bogus".parse::<DataSource>().is_err());
    }
}

//! Official patent registry (USPTO-style) JSON records.
//!
//! Last in the chain: authoritative bibliographic data but patchy full-text
//! coverage. An API key is sent in `X-API-KEY` when one is configured.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::http::{build_client, classify_status, parse_date, transport_error, trim_base};
use super::{FetchOutcome, FetchedPatent, FullTextProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::model::{DataSource, FullText, PatentMetadata, PatentStatus};
use crate::secrets::provider_api_key;

pub const DEFAULT_BASE_URL: &str = "https://api.uspto.gov/api/v1";

pub struct RegistryProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl RegistryProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = provider_api_key(config).map_err(|e| ProviderError::Credential {
            provider: config.kind,
            source: e,
        })?;
        Ok(Self::new(
            build_client(config)?,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            api_key,
        ))
    }
}

#[async_trait]
impl FullTextProvider for RegistryProvider {
    fn source(&self) -> DataSource {
        DataSource::Registry
    }

    async fn fetch(&self, patent_id: &str) -> FetchOutcome {
        let url = format!("{}/patent/grants/{}", trim_base(&self.base_url), patent_id.trim());
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return transport_error("registry record", e),
        };
        if let Some(outcome) = classify_status(&response) {
            return outcome;
        }
        match response.json::<RegistryRecord>().await {
            Ok(record) => assemble(patent_id, record),
            Err(e) => transport_error("registry record", e),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryRecord {
    #[serde(default)]
    invention_title: Option<String>,
    #[serde(default)]
    abstract_text: Option<String>,
    #[serde(default)]
    filing_date: Option<String>,
    #[serde(default)]
    grant_date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    claims: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cpc_classifications: Vec<String>,
}

fn assemble(patent_id: &str, record: RegistryRecord) -> FetchOutcome {
    let claims_text = record
        .claims
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let description_text = record
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    if claims_text.is_empty() && description_text.is_empty() {
        return FetchOutcome::NotFound;
    }

    let mut classification_codes: Vec<String> = record
        .cpc_classifications
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    classification_codes.sort();
    classification_codes.dedup();

    let grant_date = record.grant_date.as_deref().and_then(parse_date);
    let status = record
        .status
        .as_deref()
        .map(PatentStatus::from_provider_text)
        .filter(|s| *s != PatentStatus::Unknown)
        .or(grant_date.map(|_| PatentStatus::Granted));

    FetchOutcome::Found(Box::new(FetchedPatent {
        metadata: PatentMetadata {
            title: record.invention_title,
            abstract_text: record.abstract_text,
            filing_date: record.filing_date.as_deref().and_then(parse_date),
            grant_date,
            status,
        },
        full_text: FullText {
            patent_id: patent_id.to_string(),
            claims_text,
            description_text,
            classification_codes,
            data_source: DataSource::Registry,
            fetched_at: Utc::now(),
        },
    }))
}

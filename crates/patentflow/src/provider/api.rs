//! Authenticated patent search API (PatentsView-style).
//!
//! Three JSON endpoints are queried per patent: bibliographic fields,
//! claims, and the detailed description. The key travels in `X-Api-Key`.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::http::{build_client, classify_status, parse_date, transport_error, trim_base};
use super::{FetchOutcome, FetchedPatent, FullTextProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::model::{DataSource, FullText, PatentMetadata, PatentStatus};
use crate::secrets::provider_api_key;

pub const DEFAULT_BASE_URL: &str = "https://search.patentsview.org/api/v1";

const PATENT_FIELDS: &str = r#"["patent_id","patent_title","patent_abstract","patent_date","application.filing_date","cpc_current.cpc_group_id"]"#;
const CLAIM_FIELDS: &str = r#"["claim_sequence","claim_text"]"#;
const CLAIM_SORT: &str = r#"[{"claim_sequence":"asc"}]"#;
const DESCRIPTION_FIELDS: &str = r#"["description_text"]"#;

pub struct PatentsViewProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl PatentsViewProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = provider_api_key(config)
            .map_err(|e| ProviderError::Credential {
                provider: config.kind,
                source: e,
            })?
            .ok_or(ProviderError::MissingCredential(config.kind))?;
        Ok(Self::new(
            build_client(config)?,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            api_key,
        ))
    }

    /// GETs one endpoint filtered to `patent_id`. Non-success responses come
    /// back as the outcome the chain should see.
    async fn query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        patent_id: &str,
        fields: &str,
        sort: Option<&str>,
    ) -> Result<T, FetchOutcome> {
        let url = format!("{}/{}/", trim_base(&self.base_url), endpoint);
        let filter = serde_json::json!({ "patent_id": patent_id }).to_string();
        let mut params = vec![("q", filter.as_str()), ("f", fields)];
        if let Some(sort) = sort {
            params.push(("s", sort));
        }

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", self.api_key.expose_secret())
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if let Some(outcome) = classify_status(&response) {
            return Err(outcome);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| transport_error(endpoint, e))
    }
}

#[async_trait]
impl FullTextProvider for PatentsViewProvider {
    fn source(&self) -> DataSource {
        DataSource::Api
    }

    async fn fetch(&self, patent_id: &str) -> FetchOutcome {
        let patents: PatentsResponse = match self.query("patent", patent_id, PATENT_FIELDS, None).await {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        let Some(patent) = patents.patents.into_iter().next() else {
            return FetchOutcome::NotFound;
        };

        let claims: ClaimsResponse = match self
            .query("g_claim", patent_id, CLAIM_FIELDS, Some(CLAIM_SORT))
            .await
        {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        let descriptions: DescriptionResponse = match self
            .query("g_detail_desc_text", patent_id, DESCRIPTION_FIELDS, None)
            .await
        {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        assemble(patent_id, patent, claims, descriptions)
    }
}

#[derive(Debug, Deserialize)]
struct PatentsResponse {
    #[serde(default)]
    patents: Vec<PatentDoc>,
}

#[derive(Debug, Deserialize)]
struct PatentDoc {
    #[serde(default)]
    patent_title: Option<String>,
    #[serde(default)]
    patent_abstract: Option<String>,
    #[serde(default)]
    patent_date: Option<String>,
    #[serde(default)]
    application: Vec<ApplicationDoc>,
    #[serde(default)]
    cpc_current: Vec<CpcDoc>,
}

#[derive(Debug, Deserialize)]
struct ApplicationDoc {
    #[serde(default)]
    filing_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CpcDoc {
    #[serde(default)]
    cpc_group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaimsResponse {
    #[serde(default)]
    g_claims: Vec<ClaimDoc>,
}

#[derive(Debug, Deserialize)]
struct ClaimDoc {
    #[serde(default)]
    claim_sequence: Option<u32>,
    #[serde(default)]
    claim_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionResponse {
    #[serde(default)]
    g_detail_desc_texts: Vec<DescriptionDoc>,
}

#[derive(Debug, Deserialize)]
struct DescriptionDoc {
    #[serde(default)]
    description_text: Option<String>,
}

fn assemble(
    patent_id: &str,
    patent: PatentDoc,
    claims: ClaimsResponse,
    descriptions: DescriptionResponse,
) -> FetchOutcome {
    let mut claim_docs = claims.g_claims;
    claim_docs.sort_by_key(|c| c.claim_sequence.unwrap_or(u32::MAX));
    let claims_text = claim_docs
        .into_iter()
        .filter_map(|c| c.claim_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let description_text = descriptions
        .g_detail_desc_texts
        .into_iter()
        .filter_map(|d| d.description_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if claims_text.is_empty() && description_text.is_empty() {
        return FetchOutcome::NotFound;
    }

    let mut classification_codes: Vec<String> = patent
        .cpc_current
        .into_iter()
        .filter_map(|c| c.cpc_group_id)
        .collect();
    classification_codes.sort();
    classification_codes.dedup();

    let grant_date = patent.patent_date.as_deref().and_then(parse_date);
    let metadata = PatentMetadata {
        title: patent.patent_title,
        abstract_text: patent.patent_abstract,
        filing_date: patent
            .application
            .iter()
            .find_map(|a| a.filing_date.as_deref().and_then(parse_date)),
        grant_date,
        // The search API only carries granted patents.
        status: Some(PatentStatus::Granted),
    };

    FetchOutcome::Found(Box::new(FetchedPatent {
        metadata,
        full_text: FullText {
            patent_id: patent_id.to_string(),
            claims_text,
            description_text,
            classification_codes,
            data_source: DataSource::Api,
            fetched_at: Utc::now(),
        },
    }))
}

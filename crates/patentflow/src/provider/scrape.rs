//! Public patent web pages (Google-Patents-style), scraped with `scraper`.
//!
//! Slower and less structured than the API, so it only serves as the first
//! fallback. Page fields are located by their schema.org `itemprop`s.

use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use super::http::{build_client, classify_status, parse_date, transport_error, trim_base};
use super::{FetchOutcome, FetchedPatent, FullTextProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::model::{DataSource, FullText, PatentMetadata, PatentStatus};

pub const DEFAULT_BASE_URL: &str = "https://patents.google.com";

pub struct GooglePatentsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GooglePatentsProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            build_client(config)?,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
        ))
    }

    fn page_url(&self, patent_id: &str) -> String {
        format!(
            "{}/patent/{}/en",
            trim_base(&self.base_url),
            publication_number(patent_id)
        )
    }
}

#[async_trait]
impl FullTextProvider for GooglePatentsProvider {
    fn source(&self) -> DataSource {
        DataSource::Scrape
    }

    async fn fetch(&self, patent_id: &str) -> FetchOutcome {
        let response = match self.client.get(self.page_url(patent_id)).send().await {
            Ok(response) => response,
            Err(e) => return transport_error("patent page", e),
        };
        if let Some(outcome) = classify_status(&response) {
            return outcome;
        }
        match response.text().await {
            Ok(html) => parse_patent_page(patent_id, &html),
            Err(e) => transport_error("patent page", e),
        }
    }
}

/// Bulk-dataset ids carry no country prefix; pages are keyed by publication number.
fn publication_number(patent_id: &str) -> String {
    let id = patent_id.trim();
    match id.get(..2) {
        Some(prefix)
            if prefix.eq_ignore_ascii_case("US")
                && id[2..].starts_with(|c: char| c.is_ascii_digit()) =>
        {
            id.to_ascii_uppercase()
        }
        _ => format!("US{}", id.to_ascii_uppercase()),
    }
}

/// Extracts metadata and full text from a patent page.
pub fn parse_patent_page(patent_id: &str, html: &str) -> FetchOutcome {
    let document = Html::parse_document(html);

    let claims_text = all_text(&document, "section[itemprop='claims'] div.claim-text")
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let description_text = all_text(&document, "section[itemprop='description'] .description > *")
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if claims_text.is_empty() && description_text.is_empty() {
        return FetchOutcome::NotFound;
    }

    let mut classification_codes = all_text(&document, "[itemprop='classifications'] [itemprop='Code']");
    classification_codes.retain(|c| !c.is_empty());
    classification_codes.sort();
    classification_codes.dedup();

    let status = first_text(&document, "[itemprop='legalStatusIfi'] [itemprop='status']")
        .or_else(|| first_text(&document, "[itemprop='status']"))
        .map(|s| PatentStatus::from_provider_text(&s));

    let metadata = PatentMetadata {
        title: first_text(&document, "span[itemprop='title']")
            .or_else(|| first_attr(&document, "meta[name='DC.title']", "content")),
        abstract_text: first_text(&document, "section[itemprop='abstract'] div.abstract")
            .or_else(|| first_text(&document, "div.abstract")),
        filing_date: first_attr(&document, "time[itemprop='filingDate']", "datetime")
            .as_deref()
            .and_then(parse_date),
        grant_date: first_attr(&document, "time[itemprop='publicationDate']", "datetime")
            .as_deref()
            .and_then(parse_date)
            .filter(|_| status == Some(PatentStatus::Granted) || status == Some(PatentStatus::Expired)),
        status,
    };

    FetchOutcome::Found(Box::new(FetchedPatent {
        metadata,
        full_text: FullText {
            patent_id: patent_id.to_string(),
            claims_text,
            description_text,
            classification_codes,
            data_source: DataSource::Scrape,
            fetched_at: Utc::now(),
        },
    }))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn all_text(document: &Html, css: &str) -> Vec<String> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).map(element_text).collect(),
        Err(_) => Vec::new(),
    }
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .find_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><meta name="DC.title" content="Methods for analysis of cell-free DNA"></head>
<body>
  <span itemprop="title">Methods for analysis of cell-free DNA</span>
  <section itemprop="abstract"><div class="abstract">Provided herein are methods for detecting cancer.</div></section>
  <dl>
    <time itemprop="filingDate" datetime="2017-12-06">2017-12-06</time>
    <time itemprop="publicationDate" datetime="2018-12-04">2018-12-04</time>
  </dl>
  <dd itemprop="legalStatusIfi"><span itemprop="status">Active</span></dd>
  <ul>
    <li itemprop="classifications"><span itemprop="Code">C12Q1/6886</span></li>
    <li itemprop="classifications"><span itemprop="Code">C12Q1/6806</span></li>
  </ul>
  <section itemprop="description"><div class="description">
    <heading>BACKGROUND</heading>
    <p>Cancer is a   leading cause of death.</p>
  </div></section>
  <section itemprop="claims">
    <div class="claim"><div class="claim-text">1. A method comprising sequencing cfDNA.</div></div>
    <div class="claim"><div class="claim-text">2. The method of claim 1.</div></div>
  </section>
</body></html>"#;

    #[test]
    fn test_parse_patent_page() {
        let FetchOutcome::Found(found) = parse_patent_page("10144962", PAGE) else {
            panic!("expected a found outcome");
        };
        assert_eq!(
            found.full_text.claims_text,
            "1. A method comprising sequencing cfDNA.\n\n2. The method of claim 1."
        );
        assert_eq!(
            found.full_text.description_text,
            "BACKGROUND\n\nCancer is a leading cause of death."
        );
        assert_eq!(
            found.full_text.classification_codes,
            vec!["C12Q1/6806".to_string(), "C12Q1/6886".to_string()]
        );
        assert_eq!(found.full_text.data_source, DataSource::Scrape);
        assert_eq!(found.metadata.status, Some(PatentStatus::Granted));
        assert_eq!(found.metadata.grant_date, parse_date("2018-12-04"));
        assert_eq!(found.metadata.filing_date, parse_date("2017-12-06"));
        assert_eq!(
            found.metadata.title.as_deref(),
            Some("Methods for analysis of cell-free DNA")
        );
    }

    #[test]
    fn test_page_without_text_is_not_found() {
        let outcome = parse_patent_page("1", "<html><body><p>Not a patent</p></body></html>");
        assert_eq!(outcome, FetchOutcome::NotFound);
    }

    #[test]
    fn test_publication_number() {
        assert_eq!(publication_number("10144962"), "US10144962");
        assert_eq!(publication_number("RE49000"), "USRE49000");
        assert_eq!(publication_number("us10144962"), "US10144962");
    }

    #[test]
    fn test_page_url() {
        let provider = GooglePatentsProvider::new(reqwest::Client::new(), "https://patents.example.com/");
        assert_eq!(
            provider.page_url("10144962"),
            "https://patents.example.com/patent/US10144962/en"
        );
    }
}

//! Builders for assignee datasets and scripted providers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use patentflow::config::ExtractionConfig;
use patentflow::extract::CancelFlag;
use patentflow::model::{DataSource, FullText, PatentMetadata, PatentStatus};
use patentflow::provider::{FetchOutcome, FetchedPatent, FullTextProvider};

pub const ASSIGNEE_HEADER: &str = "patent_id\tassignee_id\tdisambig_assignee_organization";

/// Builder for the tab-separated assignee dataset.
pub struct DatasetBuilder {
    rows: Vec<String>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn row(mut self, patent_id: &str, assignee_id: &str, name: &str) -> Self {
        self.rows
            .push(format!("{}\t{}\t{}", patent_id, assignee_id, name));
        self
    }

    /// A raw line, for malformed-row scenarios.
    pub fn raw(mut self, line: &str) -> Self {
        self.rows.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from(ASSIGNEE_HEADER);
        out.push('\n');
        for row in &self.rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The GRAIL fixture: two GRAIL patents plus an unrelated assignee.
pub fn grail_dataset() -> DatasetBuilder {
    DatasetBuilder::new()
        .row("10144962", "a-grail", "GRAIL, Inc.")
        .row("10144963", "a-grail", "GRAIL, Inc.")
        .row("9000001", "a-illumina", "Illumina, Inc.")
        .row("9000002", "a-illumina", "Illumina, Inc.")
}

pub fn fetched(patent_id: &str, source: DataSource) -> FetchOutcome {
    FetchOutcome::Found(Box::new(FetchedPatent {
        metadata: PatentMetadata {
            title: Some(format!("Title of {}", patent_id)),
            abstract_text: Some("An abstract.".to_string()),
            filing_date: NaiveDate::from_ymd_opt(2016, 2, 12),
            grant_date: NaiveDate::from_ymd_opt(2018, 12, 4),
            status: Some(PatentStatus::Granted),
        },
        full_text: FullText {
            patent_id: patent_id.to_string(),
            claims_text: "1. A method comprising sequencing cell-free DNA.".to_string(),
            description_text: "Detailed description.".to_string(),
            classification_codes: vec!["C12Q1/6886".to_string()],
            data_source: source,
            fetched_at: Utc::now(),
        },
    }))
}

pub fn throttled() -> FetchOutcome {
    FetchOutcome::Throttled {
        retry_after: Some(Duration::from_millis(5)),
    }
}

/// Provider answering from per-identifier scripts.
///
/// Scripted outcomes are consumed in order; once a script runs dry the
/// identifier is found if registered with [`ScriptedProvider::finds`] and
/// not found otherwise.
pub struct ScriptedProvider {
    source: DataSource,
    scripts: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    always_found: HashSet<String>,
    calls: Mutex<Vec<String>>,
    cancel_on_call: Option<CancelFlag>,
    latency: Duration,
}

impl ScriptedProvider {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            scripts: Mutex::new(HashMap::new()),
            always_found: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            cancel_on_call: None,
            latency: Duration::ZERO,
        }
    }

    pub fn finds(mut self, patent_id: &str) -> Self {
        self.always_found.insert(patent_id.to_string());
        self
    }

    pub fn script(self, patent_id: &str, outcomes: Vec<FetchOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(patent_id.to_string(), outcomes.into());
        self
    }

    /// Trips `flag` on the first call.
    pub fn cancelling(mut self, flag: CancelFlag) -> Self {
        self.cancel_on_call = Some(flag);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, patent_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == patent_id)
            .count()
    }
}

#[async_trait]
impl FullTextProvider for ScriptedProvider {
    fn source(&self) -> DataSource {
        self.source
    }

    async fn fetch(&self, patent_id: &str) -> FetchOutcome {
        self.calls.lock().unwrap().push(patent_id.to_string());
        if let Some(flag) = &self.cancel_on_call {
            flag.cancel();
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(patent_id)
            .and_then(|script| script.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None if self.always_found.contains(patent_id) => fetched(patent_id, self.source),
            None => FetchOutcome::NotFound,
        }
    }
}

pub fn extraction_options(worker_count: usize) -> ExtractionConfig {
    ExtractionConfig {
        worker_count,
        company_concurrency: 2,
        persistence_retries: 3,
        upgrade_fallback_sources: true,
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, debug_span, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::bulk::BulkIndex;
use crate::config::{database_path, Config, ExtractionConfig};
use crate::db::{fulltext_repo, patent_repo, tracking_repo, Database, DatabaseError};
use crate::error::{ConfigError, PatentflowError};
use crate::model::{
    CompanyTrackingState, DataSource, ExtractionMode, FullText, PatentRecord, PatentStatus,
};
use crate::provider::{build_chain, ChainError, FetchedPatent, ProviderChain, Resolved};

use super::cancel::CancelFlag;
use super::context::{Candidate, RunContext, Settled, Settlement};
use super::error::ExtractError;
use super::mode::ModeRequest;
use super::resolver::NameResolver;
use super::result::ExtractionResult;
use super::state::RunState;

/// Pause before the first persistence retry; grows linearly per attempt.
const PERSIST_RETRY_DELAY: Duration = Duration::from_millis(50);

/// One company of an [`Extractor::extract_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRequest {
    pub company_key: String,
    pub name_variants: Vec<String>,
    pub mode: ModeRequest,
}

impl CompanyRequest {
    pub fn new(company_key: impl Into<String>, name_variants: Vec<String>) -> Self {
        Self {
            company_key: company_key.into(),
            name_variants,
            mode: ModeRequest::Auto,
        }
    }

    pub fn with_mode(mut self, mode: ModeRequest) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug)]
pub struct CompanyOutcome {
    pub company_key: String,
    pub result: Result<ExtractionResult, ExtractError>,
}

/// Drives company runs through discovery, deduplication, enrichment and
/// tracking. One extractor is shared by every run so that all of them go
/// through the same provider rate gates.
pub struct Extractor {
    db: Database,
    resolver: NameResolver,
    chain: Arc<ProviderChain>,
    options: ExtractionConfig,
}

impl Extractor {
    /// Runs persist into the index's database.
    pub fn new(index: Arc<BulkIndex>, chain: Arc<ProviderChain>, options: ExtractionConfig) -> Self {
        Self {
            db: index.database().clone(),
            resolver: NameResolver::new(index),
            chain,
            options,
        }
    }

    /// Opens the configured database and builds the index and provider chain.
    pub fn from_config(config: &Config) -> Result<Self, PatentflowError> {
        let path = database_path(config).ok_or_else(|| ConfigError::Validation {
            message: "Could not determine database path".to_string(),
        })?;
        let db = Database::open(&path)?;
        let index = BulkIndex::from_config(db, config)?;
        let chain = build_chain(config)?;
        Ok(Self::new(
            Arc::new(index),
            Arc::new(chain),
            config.extraction.clone(),
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn index(&self) -> &BulkIndex {
        self.resolver.index()
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub async fn extract(
        &self,
        company_key: &str,
        name_variants: &[String],
        mode: ModeRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        self.extract_with_cancel(company_key, name_variants, mode, &CancelFlag::new())
            .await
    }

    /// Runs one company to DONE, or to FAILED when the index is unavailable
    /// or the chain is misconfigured. A failed run leaves the company's
    /// tracking state untouched.
    pub async fn extract_with_cancel(
        &self,
        company_key: &str,
        name_variants: &[String],
        mode: ModeRequest,
        cancel: &CancelFlag,
    ) -> Result<ExtractionResult, ExtractError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("extract", run_id = %run_id, company = %company_key, request = %mode);
        self.run(&run_id, company_key, name_variants, mode, cancel)
            .instrument(span)
            .await
    }

    /// Runs several companies, at most `company_concurrency` at a time.
    /// Outcomes come back in request order.
    pub async fn extract_batch(
        &self,
        requests: Vec<CompanyRequest>,
        cancel: &CancelFlag,
    ) -> Vec<CompanyOutcome> {
        let span = info_span!("extract_batch", companies = requests.len());
        self.run_batch(requests, cancel).instrument(span).await
    }

    async fn run_batch(&self, requests: Vec<CompanyRequest>, cancel: &CancelFlag) -> Vec<CompanyOutcome> {
        stream::iter(requests)
            .map(|request| async move {
                let result = self
                    .extract_with_cancel(
                        &request.company_key,
                        &request.name_variants,
                        request.mode,
                        cancel,
                    )
                    .await;
                CompanyOutcome {
                    company_key: request.company_key,
                    result,
                }
            })
            .buffered(self.options.company_concurrency.max(1))
            .collect()
            .await
    }

    async fn run(
        &self,
        run_id: &str,
        company_key: &str,
        name_variants: &[String],
        request: ModeRequest,
        cancel: &CancelFlag,
    ) -> Result<ExtractionResult, ExtractError> {
        let mut ctx = RunContext::new(run_id, company_key, name_variants);

        match self.run_steps(&mut ctx, request, cancel).await {
            Ok(mode) => {
                info!(
                    mode = %mode,
                    found = ctx.found.len(),
                    enriched = ctx.enriched.len(),
                    unresolved = ctx.unresolved.len(),
                    errors = ctx.errors.len(),
                    skipped = ctx.skipped_known.len(),
                    calls = ctx.chain_attempts,
                    cancelled = ctx.cancelled,
                    "Extraction finished"
                );
                Ok(ctx.into_result(mode))
            }
            Err(e) => {
                let failed_in = ctx.trail.current();
                ctx.trail.advance(RunState::Failed);
                warn!(state = %failed_in, error = %e, "Extraction failed");
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        ctx: &mut RunContext,
        request: ModeRequest,
        cancel: &CancelFlag,
    ) -> Result<ExtractionMode, ExtractError> {
        // Step 1: Select mode
        ctx.trail.advance(RunState::ModeSelect);
        let mode = self.step_select_mode(ctx, request)?;
        ctx.trail.advance(match mode {
            ExtractionMode::Initial => RunState::Initial,
            ExtractionMode::Incremental => RunState::Incremental,
        });

        // Step 2: Discover identifiers
        ctx.trail.advance(RunState::Discover);
        self.step_discover(ctx, mode, cancel)
            .instrument(info_span!("discover"))
            .await?;

        // Step 3: Drop what is already settled
        ctx.trail.advance(RunState::Dedup);
        self.step_dedup(ctx, mode)?;

        // Step 4: Enrich through the provider chain
        ctx.trail.advance(RunState::Enrich);
        let span = info_span!("enrich", candidates = ctx.candidates.len());
        self.step_enrich(ctx, cancel).instrument(span).await;

        // Step 5: Write tracking state
        ctx.trail.advance(RunState::Finalize);
        self.step_finalize(ctx, mode)
            .instrument(info_span!("finalize"))
            .await?;

        ctx.trail.advance(RunState::Done);
        Ok(mode)
    }

    fn step_select_mode(&self, ctx: &RunContext, request: ModeRequest) -> Result<ExtractionMode, ExtractError> {
        let _step = info_span!("mode_select").entered();

        if self.chain.is_empty() {
            return Err(ChainError::NoProviders.into());
        }
        self.resolver
            .ensure_ready()
            .map_err(ExtractError::IndexUnavailable)?;

        let tracking = tracking_repo::get(&self.db, &ctx.company_key)
            .map_err(|e| ExtractError::database(RunState::ModeSelect, e))?;
        let mode = request.select(tracking.as_ref());
        info!(
            mode = %mode,
            previous_count = ?tracking.as_ref().map(|t| t.last_patent_count),
            "Mode selected"
        );
        Ok(mode)
    }

    async fn step_discover(
        &self,
        ctx: &mut RunContext,
        mode: ExtractionMode,
        cancel: &CancelFlag,
    ) -> Result<(), ExtractError> {
        if cancel.is_cancelled() {
            info!("Cancelled before discovery");
            ctx.cancelled = true;
            return Ok(());
        }

        let discovery = self
            .resolver
            .discover(&ctx.company_key, &ctx.name_variants)
            .await
            .map_err(ExtractError::IndexUnavailable)?;
        debug!(
            variants = ?discovery.variants,
            matched = discovery.patent_ids.len(),
            "Index lookup"
        );
        ctx.found.extend(discovery.patent_ids);

        if mode == ExtractionMode::Incremental {
            let unsettled = patent_repo::list_unsettled(&self.db, &ctx.company_key)
                .map_err(|e| ExtractError::database(RunState::Discover, e))?;
            debug!(unsettled = unsettled.len(), "Re-checking unsettled records");
            ctx.found.extend(unsettled.into_iter().map(|r| r.patent_id));
        }

        info!(found = ctx.found.len(), "Discovery complete");
        Ok(())
    }

    fn step_dedup(&self, ctx: &mut RunContext, mode: ExtractionMode) -> Result<(), ExtractError> {
        let _step = info_span!("dedup").entered();

        let known: HashMap<String, PatentRecord> =
            patent_repo::list_for_company(&self.db, &ctx.company_key)
                .map_err(|e| ExtractError::database(RunState::Dedup, e))?
                .into_iter()
                .map(|r| (r.patent_id.clone(), r))
                .collect();
        let top = self.chain.top_source();

        for patent_id in &ctx.found {
            match known.get(patent_id) {
                None => ctx.candidates.push(Candidate {
                    patent_id: patent_id.clone(),
                    force_refresh: false,
                }),
                Some(record)
                    if mode == ExtractionMode::Initial || self.wants_refresh(record, top) =>
                {
                    ctx.candidates.push(Candidate {
                        patent_id: patent_id.clone(),
                        force_refresh: record.status == PatentStatus::Pending,
                    })
                }
                Some(_) => {
                    ctx.skipped_known.insert(patent_id.clone());
                }
            }
        }

        info!(
            candidates = ctx.candidates.len(),
            skipped = ctx.skipped_known.len(),
            "Dedup complete"
        );
        Ok(())
    }

    fn wants_refresh(&self, record: &PatentRecord, top: DataSource) -> bool {
        if self.options.upgrade_fallback_sources {
            record.needs_refresh(top)
        } else {
            !record.full_text_present || record.status == PatentStatus::Pending
        }
    }

    async fn step_enrich(&self, ctx: &mut RunContext, cancel: &CancelFlag) {
        let candidates = std::mem::take(&mut ctx.candidates);
        let company_key = ctx.company_key.clone();
        let company_key = company_key.as_str();

        // The map closure runs when a worker slot frees up, so the flag is
        // read at dispatch time.
        let settled: Vec<Settled> = stream::iter(candidates)
            .map(|candidate| {
                let dispatch = !cancel.is_cancelled();
                async move {
                    if dispatch {
                        self.enrich_one(company_key, candidate).await
                    } else {
                        self.park(company_key, candidate).await
                    }
                }
            })
            .buffer_unordered(self.options.worker_count.max(1))
            .collect()
            .await;

        for outcome in settled {
            ctx.record(outcome);
        }
    }

    async fn enrich_one(&self, company_key: &str, candidate: Candidate) -> Settled {
        let span = debug_span!("identifier", patent_id = %candidate.patent_id);
        self.enrich_identifier(company_key, candidate)
            .instrument(span)
            .await
    }

    async fn enrich_identifier(&self, company_key: &str, candidate: Candidate) -> Settled {
        let patent_id = candidate.patent_id;
        let stored = match fulltext_repo::get(&self.db, &patent_id) {
            Ok(stored) => stored,
            Err(e) => {
                return Settled {
                    patent_id,
                    settlement: Settlement::Failed(e.to_string()),
                    attempts: 0,
                }
            }
        };
        let cached = if candidate.force_refresh {
            None
        } else {
            stored.as_ref()
        };

        let resolution = self.chain.resolve(&patent_id, cached).await;
        let attempts = resolution.attempts.len();

        let written = match &resolution.resolved {
            Resolved::Fetched(fetched) => {
                self.persist_with_retry(&patent_id, || {
                    self.store_fetched(company_key, fetched, stored.as_ref())
                })
                .await
            }
            Resolved::Cached(text) => {
                self.persist_with_retry(&patent_id, || self.store_cached(company_key, text))
                    .await
            }
            Resolved::Unresolved => {
                self.persist_with_retry(&patent_id, || {
                    self.store_unresolved(company_key, &patent_id)
                })
                .await
            }
        };

        let settlement = match written {
            Ok(true) => Settlement::Enriched,
            Ok(false) => Settlement::Unresolved,
            Err(e) => {
                warn!(error = %e, "Giving up on persisting identifier");
                Settlement::Failed(e.to_string())
            }
        };
        debug!(attempts, settlement = ?settlement, "Identifier settled");

        Settled {
            patent_id,
            settlement,
            attempts,
        }
    }

    /// Persists a candidate left undispatched by cancellation.
    async fn park(&self, company_key: &str, candidate: Candidate) -> Settled {
        let patent_id = candidate.patent_id;
        let written = self
            .persist_with_retry(&patent_id, || {
                self.db
                    .with_conn(|conn| patent_repo::record_unresolved(conn, company_key, &patent_id))
            })
            .await;

        let settlement = match written {
            Ok(()) => Settlement::Undispatched,
            Err(e) => Settlement::Failed(e.to_string()),
        };
        Settled {
            patent_id,
            settlement,
            attempts: 0,
        }
    }

    /// Writes the fetched text and the company's record in one transaction.
    fn store_fetched(
        &self,
        company_key: &str,
        fetched: &FetchedPatent,
        stored: Option<&FullText>,
    ) -> Result<bool, DatabaseError> {
        self.db.with_transaction(|tx| {
            let mut record =
                PatentRecord::enriched(company_key, &fetched.metadata, &fetched.full_text);
            if !fulltext_repo::upsert(tx, &fetched.full_text)? {
                // A more trusted text is kept; the record points at it.
                if let Some(stored) = stored {
                    record.source_of_record = Some(stored.data_source);
                }
            }
            patent_repo::upsert(tx, &record)?;
            Ok(true)
        })
    }

    /// Marks the company's record as backed by an already stored text.
    /// Bibliographic fields are borrowed from another company's record of
    /// the same patent when this one has none.
    fn store_cached(&self, company_key: &str, text: &FullText) -> Result<bool, DatabaseError> {
        let existing = patent_repo::get(&self.db, company_key, &text.patent_id)?;
        if let Some(record) = &existing {
            if record.full_text_present && record.source_of_record == Some(text.data_source) {
                return Ok(true);
            }
        }

        let mut record = existing
            .unwrap_or_else(|| PatentRecord::placeholder(company_key, &text.patent_id));
        if record.title.is_none() {
            if let Some(donor) = patent_repo::find_enriched(&self.db, &text.patent_id)? {
                record.title = donor.title;
                record.abstract_text = donor.abstract_text;
                record.filing_date = donor.filing_date;
                record.grant_date = donor.grant_date;
                if record.status == PatentStatus::Unknown {
                    record.status = donor.status;
                }
            }
        }
        record.full_text_present = true;
        record.source_of_record = Some(text.data_source);

        self.db.with_conn(|conn| patent_repo::upsert(conn, &record))?;
        Ok(true)
    }

    /// Records a miss. Returns whether the record still holds full text
    /// from an earlier run.
    fn store_unresolved(&self, company_key: &str, patent_id: &str) -> Result<bool, DatabaseError> {
        self.db
            .with_conn(|conn| patent_repo::record_unresolved(conn, company_key, patent_id))?;
        let record = patent_repo::get(&self.db, company_key, patent_id)?;
        Ok(record.is_some_and(|r| r.full_text_present))
    }

    async fn persist_with_retry<T, F>(&self, key: &str, op: F) -> Result<T, DatabaseError>
    where
        F: Fn() -> Result<T, DatabaseError>,
    {
        let attempts = self.options.persistence_retries.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(key = %key, attempt, error = %e, "Write failed, retrying");
                    tokio::time::sleep(PERSIST_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn step_finalize(&self, ctx: &mut RunContext, mode: ExtractionMode) -> Result<(), ExtractError> {
        let company_key = ctx.company_key.clone();
        let count = self
            .persist_with_retry(&company_key, || {
                let count = patent_repo::count_for_company(&self.db, &company_key)?;
                tracking_repo::upsert(
                    &self.db,
                    &CompanyTrackingState {
                        company_key: company_key.clone(),
                        last_extraction_at: Utc::now(),
                        last_patent_count: count,
                        extraction_mode_last_used: mode,
                    },
                )?;
                Ok(count)
            })
            .await
            .map_err(|e| ExtractError::database(RunState::Finalize, e))?;

        ctx.patent_count = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::ArchiveSource;
    use crate::config::{BulkConfig, MatchConfig};
    use crate::provider::backoff::BackoffPolicy;
    use crate::provider::{ChainEntry, FetchOutcome, FullTextProvider};
    use crate::model::PatentMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Finds every patent except those listed as missing.
    struct Stub {
        source: DataSource,
        missing: Vec<String>,
        calls: AtomicU64,
    }

    impl Stub {
        fn new(source: DataSource, missing: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                source,
                missing: missing.iter().map(|s| s.to_string()).collect(),
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FullTextProvider for Stub {
        fn source(&self) -> DataSource {
            self.source
        }

        async fn fetch(&self, patent_id: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing.iter().any(|m| m == patent_id) {
                return FetchOutcome::NotFound;
            }
            FetchOutcome::Found(Box::new(FetchedPatent {
                metadata: PatentMetadata {
                    title: Some(format!("Patent {}", patent_id)),
                    status: Some(PatentStatus::Granted),
                    ..Default::default()
                },
                full_text: FullText {
                    patent_id: patent_id.to_string(),
                    claims_text: "1. A method.".to_string(),
                    description_text: "Description.".to_string(),
                    classification_codes: vec!["C12Q1/6886".to_string()],
                    data_source: self.source,
                    fetched_at: Utc::now(),
                },
            }))
        }
    }

    fn options(persistence_retries: u32, upgrade_fallback_sources: bool) -> ExtractionConfig {
        ExtractionConfig {
            worker_count: 2,
            company_concurrency: 1,
            persistence_retries,
            upgrade_fallback_sources,
        }
    }

    async fn loaded_index(dir: &std::path::Path) -> Arc<BulkIndex> {
        let bulk: BulkConfig = serde_json::from_value(serde_json::json!({
            "archive_url": "unused",
            "archive_version": "unused"
        }))
        .unwrap();
        let index = BulkIndex::new(
            Database::open_in_memory().unwrap(),
            dir.join("cache"),
            &bulk,
            MatchConfig::default(),
        );
        let path = dir.join("assignees.tsv");
        std::fs::write(
            &path,
            "patent_id\tassignee_id\tdisambig_assignee_organization\n\
             10144962\ta1\tGRAIL, Inc.\n\
             10144963\ta1\tGRAIL, Inc.\n",
        )
        .unwrap();
        index
            .load(&ArchiveSource::new(path.to_string_lossy(), "v1"), 100)
            .await
            .unwrap();
        Arc::new(index)
    }

    fn chain_of(providers: Vec<Arc<Stub>>) -> Arc<ProviderChain> {
        let entries = providers
            .into_iter()
            .map(|p| {
                ChainEntry::new(
                    p,
                    Duration::ZERO,
                    BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2)),
                )
            })
            .collect();
        Arc::new(ProviderChain::new(entries).unwrap())
    }

    #[tokio::test]
    async fn test_run_walks_every_state() {
        let dir = tempfile::tempdir().unwrap();
        let api = Stub::new(DataSource::Api, &[]);
        let extractor = Extractor::new(
            loaded_index(dir.path()).await,
            chain_of(vec![api.clone()]),
            options(3, true),
        );

        let result = extractor
            .extract("grail", &["GRAIL Inc".to_string()], ModeRequest::Auto)
            .await
            .unwrap();

        assert_eq!(result.final_state, RunState::Done);
        assert_eq!(
            result.states,
            vec![
                RunState::Start,
                RunState::ModeSelect,
                RunState::Initial,
                RunState::Discover,
                RunState::Dedup,
                RunState::Enrich,
                RunState::Finalize,
                RunState::Done,
            ]
        );
        assert_eq!(result.patents_enriched.len(), 2);
        assert_eq!(result.patent_count, 2);
        assert_eq!(api.calls(), 2);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_fallback_records_kept_without_upgrades() {
        let dir = tempfile::tempdir().unwrap();
        let index = loaded_index(dir.path()).await;
        let scrape = Stub::new(DataSource::Scrape, &[]);

        // First run: only the scraper is available.
        let first = Extractor::new(index.clone(), chain_of(vec![scrape]), options(3, false));
        first
            .extract("grail", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();

        // Second run: the API joins, but upgrades are switched off.
        let api = Stub::new(DataSource::Api, &[]);
        let second = Extractor::new(
            index.clone(),
            chain_of(vec![api.clone(), Stub::new(DataSource::Scrape, &[])]),
            options(3, false),
        );
        let result = second
            .extract("grail", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();
        assert_eq!(result.mode, ExtractionMode::Incremental);
        assert_eq!(result.skipped_known.len(), 2);
        assert_eq!(api.calls(), 0);

        // With upgrades on, the API is consulted and its text wins.
        let upgrading = Extractor::new(
            index,
            chain_of(vec![api.clone(), Stub::new(DataSource::Scrape, &[])]),
            options(3, true),
        );
        let result = upgrading
            .extract("grail", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();
        assert_eq!(result.patents_enriched.len(), 2);
        assert_eq!(api.calls(), 2);
        let text = fulltext_repo::get(upgrading.database(), "10144962")
            .unwrap()
            .unwrap();
        assert_eq!(text.data_source, DataSource::Api);
    }

    #[tokio::test]
    async fn test_persistence_failure_reported_per_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let index = loaded_index(dir.path()).await;
        index
            .database()
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_full_text BEFORE INSERT ON full_texts
                     WHEN NEW.patent_id = '10144963'
                     BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
                )?;
                Ok(())
            })
            .unwrap();
        let extractor = Extractor::new(
            index,
            chain_of(vec![Stub::new(DataSource::Api, &[])]),
            options(2, true),
        );

        let result = extractor
            .extract("grail", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();

        assert_eq!(result.final_state, RunState::Done);
        assert!(result.patents_enriched.contains("10144962"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].patent_id, "10144963");
        assert!(result.errors[0].message.contains("disk full"));

        let tracking = tracking_repo::get(extractor.database(), "grail")
            .unwrap()
            .unwrap();
        assert_eq!(tracking.last_patent_count, 1);
    }

    #[tokio::test]
    async fn test_cached_text_shared_across_companies() {
        let dir = tempfile::tempdir().unwrap();
        let api = Stub::new(DataSource::Api, &[]);
        let extractor = Extractor::new(
            loaded_index(dir.path()).await,
            chain_of(vec![api.clone()]),
            options(3, true),
        );

        extractor
            .extract("grail", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();
        let result = extractor
            .extract("grail-holdings", &["GRAIL".to_string()], ModeRequest::Auto)
            .await
            .unwrap();

        assert_eq!(api.calls(), 2);
        assert_eq!(result.patents_enriched.len(), 2);
        let record = patent_repo::get(extractor.database(), "grail-holdings", "10144962")
            .unwrap()
            .unwrap();
        assert_eq!(record.title.as_deref(), Some("Patent 10144962"));
        assert_eq!(record.source_of_record, Some(DataSource::Api));
    }
}

//! The persistent bulk assignee index.
//!
//! Loading streams the archive chunk by chunk into the `assignees` table
//! under a generation named after the archive version. Each chunk commits
//! together with its progress counters, so an interrupted load resumes at
//! the first uncommitted record. Completing a generation swaps it in and
//! drops every older one in a single transaction.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};

use crate::bulk::archive::{ArchiveCache, ArchiveSource};
use crate::bulk::fuzzy::rank_candidates;
use crate::bulk::reader::{read_chunks, Chunk, ReaderOptions};
use crate::config::{cache_dir, BulkConfig, ColumnConfig, Config, MatchConfig};
use crate::db::assignee_repo::{self, NewAssignee};
use crate::db::load_progress_repo::{self, ChunkCounters, SAMPLE_SUFFIX};
use crate::db::Database;
use crate::error::IndexError;
use crate::model::AssigneeRecord;
use crate::normalize::{normalize_name, tokens};

/// Summary of a [`BulkIndex::load`] call.
///
/// Row counters are cumulative for the archive version, including chunks
/// committed by earlier interrupted attempts; `chunks_processed` counts only
/// this call's chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub archive_version: String,
    pub chunks_processed: u64,
    pub chunks_skipped_resume: u64,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub rows_duplicate: u64,
    pub rows_corrupt: u64,
    /// Chunk the load continued from, when it resumed an interrupted one.
    pub resumed_from_chunk: Option<u64>,
    pub completed: bool,
}

/// What the index currently serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub active_generation: Option<String>,
    pub assignee_rows: u64,
    pub distinct_patents: u64,
}

#[derive(Clone)]
pub struct BulkIndex {
    db: Database,
    cache: ArchiveCache,
    client: reqwest::Client,
    columns: ColumnConfig,
    delimiter: u8,
    matching: MatchConfig,
}

impl BulkIndex {
    pub fn new(db: Database, cache_root: impl Into<PathBuf>, bulk: &BulkConfig, matching: MatchConfig) -> Self {
        Self {
            db,
            cache: ArchiveCache::new(cache_root),
            client: reqwest::Client::new(),
            columns: bulk.columns.clone(),
            // Validated as ASCII when the config is loaded.
            delimiter: bulk.delimiter as u8,
            matching,
        }
    }

    pub fn from_config(db: Database, config: &Config) -> Result<Self, IndexError> {
        let root = cache_dir(config)
            .ok_or_else(|| IndexError::unavailable("cache", "could not determine home directory"))?;
        Ok(Self::new(db, root, &config.bulk, config.matching.clone()))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Loads the full archive, resuming an interrupted load of the same
    /// version. A version that already completed is not loaded again.
    pub async fn load(&self, source: &ArchiveSource, chunk_size: usize) -> Result<LoadStats, IndexError> {
        let span = info_span!("bulk_load", version = %source.version, source = %source.display_location());
        self.load_generation(source, chunk_size).instrument(span).await
    }

    async fn load_generation(&self, source: &ArchiveSource, chunk_size: usize) -> Result<LoadStats, IndexError> {
        if let Some(progress) = load_progress_repo::find(&self.db, &source.version)? {
            if progress.completed {
                info!("Archive version already loaded, nothing to do");
                return Ok(stats_from_progress(&progress, 0, progress.chunks_done));
            }
        }

        let path = self.cache.ensure(source, &self.client).await?;
        let progress = load_progress_repo::start(&self.db, &source.version, chunk_size as u64)?;
        if progress.rows_read > 0 {
            info!(
                chunks_done = progress.chunks_done,
                rows_read = progress.rows_read,
                "Resuming interrupted load"
            );
        }

        let job = LoadJob {
            db: self.db.clone(),
            generation: source.version.clone(),
            path,
            options: ReaderOptions {
                columns: self.columns.clone(),
                delimiter: self.delimiter,
                chunk_size,
                skip_records: progress.rows_read,
            },
            allow: None,
        };
        let span = tracing::Span::current();
        let chunks_processed = tokio::task::spawn_blocking(move || {
            let _entered = span.entered();
            job.run()
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))??;

        let finished = load_progress_repo::find(&self.db, &source.version)?
            .ok_or_else(|| IndexError::Task("load progress vanished".to_string()))?;

        let stats = stats_from_progress(&finished, chunks_processed, progress.chunks_done);
        info!(
            rows_read = stats.rows_read,
            rows_inserted = stats.rows_inserted,
            rows_corrupt = stats.rows_corrupt,
            "Bulk index generation active"
        );
        Ok(stats)
    }

    /// Loads only the rows whose normalized name is in `names` into a
    /// separate sample generation. Returns the number of rows inserted.
    ///
    /// The sample replaces earlier samples but never a full generation: it
    /// becomes active only while no full load has completed, and the next
    /// completed full load drops it. An empty allow-list returns 0 without
    /// touching the archive.
    pub async fn load_sample(&self, source: &ArchiveSource, names: &HashSet<String>) -> Result<u64, IndexError> {
        let allow: HashSet<String> = names
            .iter()
            .map(|n| normalize_name(n))
            .filter(|n| !n.is_empty())
            .collect();
        if allow.is_empty() {
            return Ok(0);
        }

        let span = info_span!("bulk_load_sample", version = %source.version, names = allow.len());
        self.load_sample_generation(source, allow).instrument(span).await
    }

    async fn load_sample_generation(&self, source: &ArchiveSource, allow: HashSet<String>) -> Result<u64, IndexError> {
        let path = self.cache.ensure(source, &self.client).await?;
        let generation = format!("{}{}", source.version, SAMPLE_SUFFIX);

        // A sample load always starts from scratch.
        self.db.with_transaction(|tx| {
            assignee_repo::delete_generation(tx, &generation)?;
            load_progress_repo::delete(tx, &generation)
        })?;
        load_progress_repo::start(&self.db, &generation, 0)?;

        let job = LoadJob {
            db: self.db.clone(),
            generation: generation.clone(),
            path,
            options: ReaderOptions {
                columns: self.columns.clone(),
                delimiter: self.delimiter,
                chunk_size: DEFAULT_SAMPLE_CHUNK,
                skip_records: 0,
            },
            allow: Some(allow),
        };
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.entered();
            job.run()
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))??;

        let inserted = load_progress_repo::find(&self.db, &generation)?
            .map(|p| p.rows_inserted)
            .unwrap_or(0);
        let active = load_progress_repo::find_active_generation(&self.db)?;
        if active.as_deref() == Some(generation.as_str()) {
            info!(inserted, "Sample generation active");
        } else {
            info!(inserted, active = ?active, "Sample loaded, full generation stays active");
        }
        Ok(inserted)
    }

    /// Patent ids for the first name variant that matches.
    ///
    /// Every variant is tried for an exact normalized match first, in order.
    /// Only when none matches exactly is each variant tried again with
    /// fuzzy matching: every name sharing its first word is scored, and the
    /// patents of the best `max_candidates` names above the threshold are
    /// returned.
    pub fn lookup(&self, name_variants: &[String]) -> Result<BTreeSet<String>, IndexError> {
        let generation = self.ensure_ready()?;

        let mut seen = HashSet::new();
        let normalized: Vec<String> = name_variants
            .iter()
            .map(|v| normalize_name(v))
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect();

        for variant in &normalized {
            let ids = assignee_repo::find_patents_by_name(&self.db, &generation, variant)?;
            if !ids.is_empty() {
                debug!(variant = %variant, matches = ids.len(), "Exact assignee match");
                return Ok(ids);
            }
        }

        for variant in &normalized {
            let Some(first_word) = tokens(variant).first().copied() else {
                continue;
            };
            let candidates = assignee_repo::find_names_with_prefix(&self.db, &generation, first_word)?;
            let ranked = rank_candidates(
                self.matching.strategy,
                self.matching.threshold,
                variant,
                &candidates,
            );

            let mut ids = BTreeSet::new();
            for (name, score) in ranked.iter().take(self.matching.max_candidates) {
                debug!(variant = %variant, candidate = %name, score, "Fuzzy assignee match");
                ids.extend(assignee_repo::find_patents_by_name(&self.db, &generation, name)?);
            }
            if !ids.is_empty() {
                return Ok(ids);
            }
        }

        Ok(BTreeSet::new())
    }

    pub fn status(&self) -> Result<IndexStatus, IndexError> {
        let Some(generation) = load_progress_repo::find_active_generation(&self.db)? else {
            return Ok(IndexStatus::default());
        };
        Ok(IndexStatus {
            assignee_rows: assignee_repo::count_rows(&self.db, &generation)?,
            distinct_patents: assignee_repo::count_distinct_patents(&self.db, &generation)?,
            active_generation: Some(generation),
        })
    }

    /// Assignee rows of the active generation filed under `name`, with the
    /// assignee's total patent count.
    pub fn assignee_records(&self, name: &str) -> Result<Vec<AssigneeRecord>, IndexError> {
        let generation = self.ensure_ready()?;
        Ok(assignee_repo::find_records_by_name(
            &self.db,
            &generation,
            &normalize_name(name),
        )?)
    }

    /// The active generation, or `SourceUnavailable` when nothing is loaded.
    pub fn ensure_ready(&self) -> Result<String, IndexError> {
        load_progress_repo::find_active_generation(&self.db)?
            .ok_or_else(|| IndexError::unavailable("bulk index", "no completed index generation"))
    }
}

const DEFAULT_SAMPLE_CHUNK: usize = 10_000;

/// Blocking half of a load, run on the blocking pool.
struct LoadJob {
    db: Database,
    generation: String,
    path: PathBuf,
    options: ReaderOptions,
    allow: Option<HashSet<String>>,
}

impl LoadJob {
    /// Returns the number of chunks committed.
    fn run(self) -> Result<u64, IndexError> {
        let mut committed = 0u64;
        read_chunks(&self.path, &self.options, |chunk| {
            self.commit_chunk(chunk)?;
            committed += 1;
            Ok(())
        })?;

        self.db.with_transaction(|tx| {
            assignee_repo::recompute_patent_counts(tx, &self.generation)?;
            // A sample only supersedes earlier samples.
            let dropped = if self.allow.is_some() {
                load_progress_repo::delete_other_samples(tx, &self.generation)?;
                assignee_repo::delete_other_samples(tx, &self.generation)?
            } else {
                load_progress_repo::delete_other_versions(tx, &self.generation)?;
                assignee_repo::delete_other_generations(tx, &self.generation)?
            };
            load_progress_repo::mark_completed(tx, &self.generation)?;
            if dropped > 0 {
                log::info!("Dropped {} rows of superseded index generations", dropped);
            }
            Ok(())
        })?;

        Ok(committed)
    }

    fn commit_chunk(&self, chunk: Chunk) -> Result<(), IndexError> {
        let rows: Vec<NewAssignee> = match &self.allow {
            Some(allow) => chunk
                .rows
                .into_iter()
                .filter(|row| allow.contains(&row.normalized_name))
                .collect(),
            None => chunk.rows,
        };

        self.db.with_transaction(|tx| {
            let outcome = assignee_repo::insert_chunk(tx, &self.generation, &rows)?;
            load_progress_repo::record_chunk(
                tx,
                &self.generation,
                &ChunkCounters {
                    rows_read: chunk.rows_read,
                    rows_inserted: outcome.inserted,
                    rows_duplicate: outcome.duplicate,
                    rows_corrupt: chunk.rows_corrupt,
                },
            )
        })?;

        log::debug!(
            "Committed chunk {} of generation {} ({} rows)",
            chunk.index,
            self.generation,
            rows.len()
        );
        Ok(())
    }
}

fn stats_from_progress(
    progress: &load_progress_repo::LoadProgressRow,
    chunks_processed: u64,
    chunks_skipped: u64,
) -> LoadStats {
    LoadStats {
        archive_version: progress.archive_version.clone(),
        chunks_processed,
        chunks_skipped_resume: chunks_skipped,
        rows_read: progress.rows_read,
        rows_inserted: progress.rows_inserted,
        rows_duplicate: progress.rows_duplicate,
        rows_corrupt: progress.rows_corrupt,
        resumed_from_chunk: (chunks_skipped > 0 && chunks_processed > 0).then_some(chunks_skipped),
        completed: progress.completed,
    }
}

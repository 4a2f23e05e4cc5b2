//! Test harness for isolated extraction runs.
//!
//! Each harness owns a temp directory holding the SQLite database, the
//! archive cache and any fixture archives written by the test.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use patentflow::bulk::{ArchiveSource, BulkIndex, LoadStats};
use patentflow::config::{BulkConfig, ExtractionConfig, MatchConfig};
use patentflow::db::Database;
use patentflow::extract::Extractor;
use patentflow::provider::backoff::BackoffPolicy;
use patentflow::provider::{ChainEntry, ProviderChain};

use super::builders::ScriptedProvider;

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub index: Arc<BulkIndex>,
}

impl TestHarness {
    /// Create a harness with a file-backed database and default matching.
    pub fn new() -> Self {
        Self::with_matching(MatchConfig::default())
    }

    pub fn with_matching(matching: MatchConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("data").join("patentflow.db"))
            .expect("Failed to open database");
        let bulk: BulkConfig = serde_json::from_value(serde_json::json!({
            "archive_url": "unused",
            "archive_version": "unused"
        }))
        .expect("Failed to build bulk config");
        let index = BulkIndex::new(
            db.clone(),
            temp_dir.path().join("cache"),
            &bulk,
            matching,
        );

        Self {
            temp_dir,
            db,
            index: Arc::new(index),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` as the single `.tsv` entry of a zip archive.
    pub fn write_archive(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(file_name);
        let file = std::fs::File::create(&path).expect("Failed to create archive");
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("g_assignee_disambiguated.tsv", SimpleFileOptions::default())
            .expect("Failed to start archive entry");
        zip.write_all(content.as_bytes())
            .expect("Failed to write archive entry");
        zip.finish().expect("Failed to finish archive");
        path
    }

    /// Write an archive and load it as `version`.
    pub async fn load_dataset(&self, version: &str, content: &str) -> LoadStats {
        let path = self.write_archive(&format!("{}.zip", version), content);
        let source = ArchiveSource::new(path.to_string_lossy(), version);
        self.index
            .load(&source, 2)
            .await
            .expect("Failed to load dataset")
    }

    /// A chain over `providers` with no pacing and millisecond backoff.
    pub fn chain(providers: &[Arc<ScriptedProvider>]) -> Arc<ProviderChain> {
        let entries = providers
            .iter()
            .map(|p| {
                ChainEntry::new(
                    p.clone(),
                    Duration::ZERO,
                    BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(10)),
                )
            })
            .collect();
        Arc::new(ProviderChain::new(entries).expect("Failed to build chain"))
    }

    pub fn extractor(&self, providers: &[Arc<ScriptedProvider>], options: ExtractionConfig) -> Extractor {
        Extractor::new(self.index.clone(), Self::chain(providers), options)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

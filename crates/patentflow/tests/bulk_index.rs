//! Loading zip archives into the bulk index and querying it.

mod common;

use std::collections::HashSet;

use patentflow::bulk::ArchiveSource;
use patentflow::config::{FuzzyStrategy, MatchConfig};
use patentflow::db::load_progress_repo;

use common::{grail_dataset, DatasetBuilder, TestHarness};

#[tokio::test]
async fn test_zip_archive_load() {
    let harness = TestHarness::new();
    let dataset = grail_dataset()
        .raw("not-a-row")
        .row("", "a-x", "Nameless Patent Corp")
        .build();

    let stats = harness.load_dataset("2026-09-30", &dataset).await;

    assert!(stats.completed);
    assert_eq!(stats.rows_inserted, 4);
    assert_eq!(stats.rows_corrupt, 2);
    let status = harness.index.status().unwrap();
    assert_eq!(status.active_generation.as_deref(), Some("2026-09-30"));
    assert_eq!(status.distinct_patents, 4);

    let cached = harness
        .temp_path()
        .join("cache")
        .join("2026-09-30")
        .join("VERSION");
    assert!(cached.exists());
}

#[tokio::test]
async fn test_lookup_is_deterministic() {
    let harness = TestHarness::new();
    harness.load_dataset("v1", &grail_dataset().build()).await;
    let variants = vec!["Grail Incorporated".to_string(), "GRAIL LLC".to_string()];

    let first = harness.index.lookup(&variants).unwrap();
    for _ in 0..5 {
        assert_eq!(harness.index.lookup(&variants).unwrap(), first);
    }
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn test_assignee_records_carry_patent_count() {
    let harness = TestHarness::new();
    harness.load_dataset("v1", &grail_dataset().build()).await;

    let records = harness.index.assignee_records("GRAIL, Inc.").unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.assignee_id == "a-grail" && r.patent_count == 2));
    assert!(harness.index.assignee_records("Unknown Co").unwrap().is_empty());
}

#[tokio::test]
async fn test_fuzzy_lookup_matches_near_names() {
    let harness = TestHarness::with_matching(MatchConfig {
        strategy: FuzzyStrategy::TokenSet,
        threshold: 0.5,
        max_candidates: 50,
    });
    let dataset = DatasetBuilder::new()
        .row("1", "a1", "Grail Bio Sciences Inc")
        .row("2", "a2", "Graphite Labs")
        .build();
    harness.load_dataset("v1", &dataset).await;

    let ids = harness
        .index
        .lookup(&["Grail Bio".to_string()])
        .unwrap();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["1"]);
}

#[tokio::test]
async fn test_new_version_replaces_generation() {
    let harness = TestHarness::new();
    harness.load_dataset("v1", &grail_dataset().build()).await;
    let v2 = DatasetBuilder::new()
        .row("11111111", "a-grail", "GRAIL, Inc.")
        .build();
    harness.load_dataset("v2", &v2).await;

    let ids = harness.index.lookup(&["GRAIL".to_string()]).unwrap();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["11111111"]);
    assert!(load_progress_repo::find(&harness.db, "v1").unwrap().is_none());
}

#[tokio::test]
async fn test_load_sample_empty_set_touches_nothing() {
    let harness = TestHarness::new();
    // Unroutable; any network access would fail the call.
    let source = ArchiveSource::new("http://192.0.2.1/never.zip", "v-sample");

    let inserted = harness
        .index
        .load_sample(&source, &HashSet::new())
        .await
        .unwrap();

    assert_eq!(inserted, 0);
    assert!(!harness.temp_path().join("cache").exists());
    assert!(harness.index.status().unwrap().active_generation.is_none());
}

#[tokio::test]
async fn test_load_sample_keeps_only_allowed_names() {
    let harness = TestHarness::new();
    let path = harness.write_archive("full.zip", &grail_dataset().build());
    let source = ArchiveSource::new(path.to_string_lossy(), "v1");
    let names: HashSet<String> = ["Grail Inc".to_string()].into_iter().collect();

    let inserted = harness.index.load_sample(&source, &names).await.unwrap();

    assert_eq!(inserted, 2);
    assert!(harness
        .index
        .lookup(&["Illumina".to_string()])
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_load_sample_never_replaces_full_generation() {
    let harness = TestHarness::new();
    harness.load_dataset("v1", &grail_dataset().build()).await;

    let path = harness.write_archive("sample.zip", &grail_dataset().build());
    let names: HashSet<String> = ["Grail Inc".to_string()].into_iter().collect();
    let inserted = harness
        .index
        .load_sample(&ArchiveSource::new(path.to_string_lossy(), "v1"), &names)
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let status = harness.index.status().unwrap();
    assert_eq!(status.active_generation.as_deref(), Some("v1"));
    assert_eq!(status.distinct_patents, 4);
    assert_eq!(
        harness.index.lookup(&["Illumina".to_string()]).unwrap().len(),
        2
    );

    // The next full load drops the sample along with the old generation.
    harness.load_dataset("v2", &grail_dataset().build()).await;
    assert!(load_progress_repo::find(&harness.db, "v1+sample")
        .unwrap()
        .is_none());
    assert_eq!(
        harness.index.status().unwrap().active_generation.as_deref(),
        Some("v2")
    );
}

//! Load progress repository: resumable bookkeeping for bulk index loads.
//!
//! One row per archive version. Chunk counters are updated in the same
//! transaction as the chunk's inserts so a crash never double counts.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

/// Suffix of generations built from a name allow-list rather than the
/// full archive.
pub const SAMPLE_SUFFIX: &str = "+sample";

/// A raw load progress row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgressRow {
    pub archive_version: String,
    pub chunk_size: u64,
    pub chunks_done: u64,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub rows_duplicate: u64,
    pub rows_corrupt: u64,
    pub completed: bool,
    pub started_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

/// Counters contributed by one committed chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCounters {
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub rows_duplicate: u64,
    pub rows_corrupt: u64,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoadProgressRow> {
    Ok(LoadProgressRow {
        archive_version: row.get(0)?,
        chunk_size: row.get(1)?,
        chunks_done: row.get(2)?,
        rows_read: row.get(3)?,
        rows_inserted: row.get(4)?,
        rows_duplicate: row.get(5)?,
        rows_corrupt: row.get(6)?,
        completed: row.get::<_, i64>(7)? != 0,
        started_at: row.get(8)?,
        updated_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

const SELECT_COLUMNS: &str = "archive_version, chunk_size, chunks_done, rows_read, rows_inserted,
     rows_duplicate, rows_corrupt, completed, started_at, updated_at, completed_at";

/// Finds the progress row for an archive version.
pub fn find(db: &Database, archive_version: &str) -> Result<Option<LoadProgressRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM load_progress WHERE archive_version = ?1",
                    SELECT_COLUMNS
                ),
                params![archive_version],
                map_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Creates the progress row for a version unless one already exists.
/// Returns the current row.
pub fn start(
    db: &Database,
    archive_version: &str,
    chunk_size: u64,
) -> Result<LoadProgressRow, DatabaseError> {
    let now = Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO load_progress (archive_version, chunk_size, started_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![archive_version, chunk_size, now],
        )?;
        let row = conn.query_row(
            &format!(
                "SELECT {} FROM load_progress WHERE archive_version = ?1",
                SELECT_COLUMNS
            ),
            params![archive_version],
            map_row,
        )?;
        Ok(row)
    })
}

/// Adds one committed chunk to the counters.
pub fn record_chunk(
    conn: &Connection,
    archive_version: &str,
    counters: &ChunkCounters,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE load_progress SET
           chunks_done = chunks_done + 1,
           rows_read = rows_read + ?2,
           rows_inserted = rows_inserted + ?3,
           rows_duplicate = rows_duplicate + ?4,
           rows_corrupt = rows_corrupt + ?5,
           updated_at = ?6
         WHERE archive_version = ?1",
        params![
            archive_version,
            counters.rows_read,
            counters.rows_inserted,
            counters.rows_duplicate,
            counters.rows_corrupt,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Marks a version as fully loaded.
pub fn mark_completed(conn: &Connection, archive_version: &str) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE load_progress SET completed = 1, completed_at = ?2, updated_at = ?2
         WHERE archive_version = ?1",
        params![archive_version, now],
    )?;
    Ok(())
}

/// Drops progress rows of every other version.
pub fn delete_other_versions(conn: &Connection, keep: &str) -> Result<u64, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM load_progress WHERE archive_version != ?1",
        params![keep],
    )?;
    Ok(deleted as u64)
}

/// Drops progress rows of every other sample generation. Full versions
/// are kept.
pub fn delete_other_samples(conn: &Connection, keep: &str) -> Result<u64, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM load_progress
         WHERE archive_version != ?1 AND substr(archive_version, -length(?2)) = ?2",
        params![keep, SAMPLE_SUFFIX],
    )?;
    Ok(deleted as u64)
}

/// Drops the progress row of one version.
pub fn delete(conn: &Connection, archive_version: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM load_progress WHERE archive_version = ?1",
        params![archive_version],
    )?;
    Ok(())
}

/// The most recently completed archive version, if any. A completed full
/// version always wins over a sample.
pub fn find_active_generation(db: &Database) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let version = conn
            .query_row(
                "SELECT archive_version FROM load_progress WHERE completed = 1
                 ORDER BY substr(archive_version, -length(?1)) = ?1, completed_at DESC
                 LIMIT 1",
                params![SAMPLE_SUFFIX],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(version)
    })
}

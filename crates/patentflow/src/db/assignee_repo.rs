//! Assignee repository: the `assignees` table backing the bulk index.
//!
//! Rows are partitioned by `generation` (the archive version they were
//! loaded from). Readers always pass the active generation so a reload in
//! progress never leaks half-loaded rows into lookups.

use std::collections::BTreeSet;

use rusqlite::{params, Connection};

use crate::model::AssigneeRecord;

use super::load_progress_repo::SAMPLE_SUFFIX;
use super::{Database, DatabaseError};

/// A normalized row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignee {
    pub assignee_id: String,
    pub raw_name: String,
    pub normalized_name: String,
    pub patent_id: String,
}

/// Outcome of inserting one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkInsert {
    pub inserted: u64,
    pub duplicate: u64,
}

/// Inserts a chunk of rows. `(assignee_id, patent_id)` pairs already present
/// in the generation are ignored and counted as duplicates.
pub fn insert_chunk(
    conn: &Connection,
    generation: &str,
    rows: &[NewAssignee],
) -> Result<ChunkInsert, DatabaseError> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO assignees (assignee_id, raw_name, normalized_name, patent_id, generation)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut outcome = ChunkInsert::default();
    for row in rows {
        let changed = stmt.execute(params![
            row.assignee_id,
            row.raw_name,
            row.normalized_name,
            row.patent_id,
            generation,
        ])?;
        if changed == 0 {
            outcome.duplicate += 1;
        } else {
            outcome.inserted += 1;
        }
    }
    Ok(outcome)
}

/// Recomputes `patent_count` for every assignee of a generation.
pub fn recompute_patent_counts(conn: &Connection, generation: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE assignees SET patent_count = (
             SELECT COUNT(*) FROM assignees AS a
             WHERE a.generation = assignees.generation AND a.assignee_id = assignees.assignee_id
         )
         WHERE generation = ?1",
        params![generation],
    )?;
    Ok(())
}

/// Removes every row not belonging to `keep`. Returns the number deleted.
pub fn delete_other_generations(conn: &Connection, keep: &str) -> Result<u64, DatabaseError> {
    let deleted = conn.execute("DELETE FROM assignees WHERE generation != ?1", params![keep])?;
    Ok(deleted as u64)
}

/// Removes the rows of every other sample generation, keeping full ones.
pub fn delete_other_samples(conn: &Connection, keep: &str) -> Result<u64, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM assignees
         WHERE generation != ?1 AND substr(generation, -length(?2)) = ?2",
        params![keep, SAMPLE_SUFFIX],
    )?;
    Ok(deleted as u64)
}

/// Removes every row of one generation. Returns the number deleted.
pub fn delete_generation(conn: &Connection, generation: &str) -> Result<u64, DatabaseError> {
    let deleted = conn.execute("DELETE FROM assignees WHERE generation = ?1", params![generation])?;
    Ok(deleted as u64)
}

/// Patent ids for an exact normalized-name match.
pub fn find_patents_by_name(
    db: &Database,
    generation: &str,
    normalized_name: &str,
) -> Result<BTreeSet<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT patent_id FROM assignees
             WHERE generation = ?1 AND normalized_name = ?2",
        )?;
        let ids = stmt
            .query_map(params![generation, normalized_name], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    })
}

/// Distinct normalized names starting with `prefix`, in name order.
///
/// A half-open range over `(generation, normalized_name)` so the scan stays
/// inside the names sharing the prefix.
pub fn find_names_with_prefix(
    db: &Database,
    generation: &str,
    prefix: &str,
) -> Result<Vec<String>, DatabaseError> {
    if prefix.is_empty() {
        return Ok(Vec::new());
    }

    db.with_conn(|conn| {
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT normalized_name FROM assignees
             WHERE generation = ?1
               AND normalized_name >= ?2
               AND normalized_name < ?2 || char(1114111)
             ORDER BY normalized_name",
        )?;
        let names = stmt
            .query_map(params![generation, prefix], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    })
}

/// Full records for a normalized name, ordered by assignee then patent.
pub fn find_records_by_name(
    db: &Database,
    generation: &str,
    normalized_name: &str,
) -> Result<Vec<AssigneeRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT assignee_id, raw_name, normalized_name, patent_id, patent_count
             FROM assignees
             WHERE generation = ?1 AND normalized_name = ?2
             ORDER BY assignee_id, patent_id",
        )?;
        let rows = stmt
            .query_map(params![generation, normalized_name], |row| {
                Ok(AssigneeRecord {
                    assignee_id: row.get(0)?,
                    raw_name: row.get(1)?,
                    normalized_name: row.get(2)?,
                    patent_id: row.get(3)?,
                    patent_count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Row count for a generation.
pub fn count_rows(db: &Database, generation: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM assignees WHERE generation = ?1",
            params![generation],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Distinct patent ids in a generation.
pub fn count_distinct_patents(db: &Database, generation: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(DISTINCT patent_id) FROM assignees WHERE generation = ?1",
            params![generation],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn row(assignee_id: &str, name: &str, patent_id: &str) -> NewAssignee {
        NewAssignee {
            assignee_id: assignee_id.to_string(),
            raw_name: name.to_string(),
            normalized_name: name.to_uppercase(),
            patent_id: patent_id.to_string(),
        }
    }

    fn seed(db: &Database, generation: &str, rows: &[NewAssignee]) -> ChunkInsert {
        db.with_transaction(|tx| insert_chunk(tx, generation, rows))
            .unwrap()
    }

    #[test]
    fn test_insert_chunk_counts_duplicates() {
        let db = test_db();
        let outcome = seed(
            &db,
            "v1",
            &[
                row("a1", "grail", "10144962"),
                row("a1", "grail", "10144963"),
                row("a1", "grail", "10144962"),
            ],
        );
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.duplicate, 1);
        assert_eq!(count_rows(&db, "v1").unwrap(), 2);
    }

    #[test]
    fn test_same_pair_allowed_in_another_generation() {
        let db = test_db();
        seed(&db, "v1", &[row("a1", "grail", "10144962")]);
        let outcome = seed(&db, "v2", &[row("a1", "grail", "10144962")]);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn test_find_patents_by_name_is_generation_scoped() {
        let db = test_db();
        seed(&db, "v1", &[row("a1", "grail", "1")]);
        seed(&db, "v2", &[row("a1", "grail", "2")]);

        let v1 = find_patents_by_name(&db, "v1", "GRAIL").unwrap();
        assert_eq!(v1.into_iter().collect::<Vec<_>>(), vec!["1".to_string()]);
        let v2 = find_patents_by_name(&db, "v2", "GRAIL").unwrap();
        assert_eq!(v2.into_iter().collect::<Vec<_>>(), vec!["2".to_string()]);
    }

    #[test]
    fn test_recompute_patent_counts() {
        let db = test_db();
        seed(
            &db,
            "v1",
            &[
                row("a1", "grail", "1"),
                row("a1", "grail", "2"),
                row("a2", "illumina", "3"),
            ],
        );
        db.with_conn(|conn| recompute_patent_counts(conn, "v1"))
            .unwrap();

        let records = find_records_by_name(&db, "v1", "GRAIL").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.patent_count == 2));
        let records = find_records_by_name(&db, "v1", "ILLUMINA").unwrap();
        assert_eq!(records[0].patent_count, 1);
    }

    #[test]
    fn test_find_names_with_prefix() {
        let db = test_db();
        seed(
            &db,
            "v1",
            &[
                row("a1", "grail", "1"),
                row("a2", "grail bio", "2"),
                row("a3", "grailway", "3"),
                row("a4", "illumina", "4"),
                row("a5", "gra", "5"),
            ],
        );
        seed(&db, "v2", &[row("a6", "grail europe", "6")]);

        let names = find_names_with_prefix(&db, "v1", "GRAIL").unwrap();
        assert_eq!(names, vec!["GRAIL", "GRAIL BIO", "GRAILWAY"]);
        assert!(find_names_with_prefix(&db, "v1", "GR%").unwrap().is_empty());
        assert!(find_names_with_prefix(&db, "v1", "").unwrap().is_empty());
    }

    #[test]
    fn test_name_queries_use_generation_name_index() {
        let db = test_db();
        let details: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "EXPLAIN QUERY PLAN
                     SELECT DISTINCT normalized_name FROM assignees
                     WHERE generation = 'v1'
                       AND normalized_name >= 'ACME'
                       AND normalized_name < 'ACME' || char(1114111)
                     ORDER BY normalized_name",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(3))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap();

        assert!(
            details
                .iter()
                .any(|d| d.contains("idx_assignees_generation_name")),
            "plan was {:?}",
            details
        );
    }

    #[test]
    fn test_delete_other_generations() {
        let db = test_db();
        seed(&db, "v1", &[row("a1", "grail", "1")]);
        seed(&db, "v2", &[row("a1", "grail", "1"), row("a1", "grail", "2")]);

        let deleted = db
            .with_conn(|conn| delete_other_generations(conn, "v2"))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count_rows(&db, "v1").unwrap(), 0);
        assert_eq!(count_distinct_patents(&db, "v2").unwrap(), 2);
    }

    #[test]
    fn test_delete_generation() {
        let db = test_db();
        seed(&db, "v1", &[row("a1", "grail", "1")]);
        seed(&db, "v2", &[row("a1", "grail", "1")]);

        let deleted = db.with_conn(|conn| delete_generation(conn, "v1")).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count_rows(&db, "v2").unwrap(), 1);
    }
}

//! Company tracking repository: one row per company, read to choose the
//! next run's mode and written when a run finalizes.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::model::{CompanyTrackingState, ExtractionMode};

use super::{Database, DatabaseError};

struct RawTrackingRow {
    company_key: String,
    last_extraction_at: String,
    last_patent_count: u32,
    extraction_mode_last_used: String,
}

fn map_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrackingRow> {
    Ok(RawTrackingRow {
        company_key: row.get(0)?,
        last_extraction_at: row.get(1)?,
        last_patent_count: row.get(2)?,
        extraction_mode_last_used: row.get(3)?,
    })
}

fn decode(raw: RawTrackingRow) -> Result<CompanyTrackingState, DatabaseError> {
    let last_extraction_at = DateTime::parse_from_rfc3339(&raw.last_extraction_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode {
            column: "last_extraction_at",
            reason: e.to_string(),
        })?;
    let extraction_mode_last_used = raw
        .extraction_mode_last_used
        .parse::<ExtractionMode>()
        .map_err(|reason| DatabaseError::Decode {
            column: "extraction_mode_last_used",
            reason,
        })?;

    Ok(CompanyTrackingState {
        company_key: raw.company_key,
        last_extraction_at,
        last_patent_count: raw.last_patent_count,
        extraction_mode_last_used,
    })
}

/// Finds the tracking state of a company.
pub fn get(db: &Database, company_key: &str) -> Result<Option<CompanyTrackingState>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let raw = conn
            .query_row(
                "SELECT company_key, last_extraction_at, last_patent_count, extraction_mode_last_used
                 FROM company_tracking WHERE company_key = ?1",
                params![company_key],
                map_raw,
            )
            .optional()?;
        Ok(raw)
    })?;
    raw.map(decode).transpose()
}

/// Inserts or replaces the tracking state of a company.
pub fn upsert(db: &Database, state: &CompanyTrackingState) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO company_tracking (company_key, last_extraction_at, last_patent_count,
                 extraction_mode_last_used)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(company_key) DO UPDATE SET
               last_extraction_at = excluded.last_extraction_at,
               last_patent_count = excluded.last_patent_count,
               extraction_mode_last_used = excluded.extraction_mode_last_used",
            params![
                state.company_key,
                state.last_extraction_at.to_rfc3339(),
                state.last_patent_count,
                state.extraction_mode_last_used.as_str(),
            ],
        )?;
        Ok(())
    })
}

/// Companies whose last extraction is older than `cutoff`, oldest first.
pub fn list_due(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<CompanyTrackingState>, DatabaseError> {
    let raws = db.with_conn(|conn| {
        // RFC 3339 strings in UTC sort chronologically.
        let mut stmt = conn.prepare(
            "SELECT company_key, last_extraction_at, last_patent_count, extraction_mode_last_used
             FROM company_tracking WHERE last_extraction_at < ?1
             ORDER BY last_extraction_at",
        )?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], map_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    raws.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn state(company: &str, at: DateTime<Utc>, count: u32) -> CompanyTrackingState {
        CompanyTrackingState {
            company_key: company.to_string(),
            last_extraction_at: at,
            last_patent_count: count,
            extraction_mode_last_used: ExtractionMode::Initial,
        }
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = test_db();
        assert!(get(&db, "grail").unwrap().is_none());
    }

    #[test]
    fn test_upsert_and_get() {
        let db = test_db();
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        upsert(&db, &state("grail", at, 2)).unwrap();
        assert_eq!(get(&db, "grail").unwrap().unwrap(), state("grail", at, 2));

        let mut next = state("grail", at + Duration::days(1), 3);
        next.extraction_mode_last_used = ExtractionMode::Incremental;
        upsert(&db, &next).unwrap();
        assert_eq!(get(&db, "grail").unwrap().unwrap(), next);
    }

    #[test]
    fn test_list_due() {
        let db = test_db();
        let old = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let recent = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        upsert(&db, &state("recent", recent, 1)).unwrap();
        upsert(&db, &state("old", old, 1)).unwrap();

        let due = list_due(&db, Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].company_key, "old");
    }
}

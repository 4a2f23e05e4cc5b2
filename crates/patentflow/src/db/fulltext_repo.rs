//! Full text repository: one `FullText` per patent id.
//!
//! Writes never downgrade: a row from a higher-trust source is only
//! replaced by a row from a source of equal or higher trust.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{DataSource, FullText};

use super::{Database, DatabaseError};

/// Stores a full text. Returns `false` when an existing row from a more
/// trusted source was kept instead.
pub fn upsert(conn: &Connection, full_text: &FullText) -> Result<bool, DatabaseError> {
    let codes = serde_json::to_string(&full_text.classification_codes).map_err(|e| {
        DatabaseError::Decode {
            column: "classification_codes",
            reason: e.to_string(),
        }
    })?;

    let changed = conn.execute(
        "INSERT INTO full_texts (patent_id, claims_text, description_text, classification_codes,
             data_source, source_rank, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(patent_id) DO UPDATE SET
           claims_text = excluded.claims_text,
           description_text = excluded.description_text,
           classification_codes = excluded.classification_codes,
           data_source = excluded.data_source,
           source_rank = excluded.source_rank,
           fetched_at = excluded.fetched_at
         WHERE excluded.source_rank <= full_texts.source_rank",
        params![
            full_text.patent_id,
            full_text.claims_text,
            full_text.description_text,
            codes,
            full_text.data_source.as_str(),
            full_text.data_source.rank(),
            full_text.fetched_at.to_rfc3339(),
        ],
    )?;
    Ok(changed > 0)
}

/// Finds the stored full text for a patent.
pub fn get(db: &Database, patent_id: &str) -> Result<Option<FullText>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let raw = conn
            .query_row(
                "SELECT patent_id, claims_text, description_text, classification_codes,
                        data_source, fetched_at
                 FROM full_texts WHERE patent_id = ?1",
                params![patent_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        Ok(raw)
    })?;

    let Some((patent_id, claims_text, description_text, codes, source, fetched_at)) = raw else {
        return Ok(None);
    };

    let classification_codes: Vec<String> =
        serde_json::from_str(&codes).map_err(|e| DatabaseError::Decode {
            column: "classification_codes",
            reason: e.to_string(),
        })?;
    let data_source = source
        .parse::<DataSource>()
        .map_err(|reason| DatabaseError::Decode {
            column: "data_source",
            reason,
        })?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode {
            column: "fetched_at",
            reason: e.to_string(),
        })?;

    Ok(Some(FullText {
        patent_id,
        claims_text,
        description_text,
        classification_codes,
        data_source,
        fetched_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn text(patent_id: &str, source: DataSource, claims: &str) -> FullText {
        FullText {
            patent_id: patent_id.to_string(),
            claims_text: claims.to_string(),
            description_text: "Description".to_string(),
            classification_codes: vec!["C12Q1/6886".to_string(), "G16B20/00".to_string()],
            data_source: source,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let db = test_db();
        let ft = text("10144962", DataSource::Scrape, "1. A method...");
        assert!(db.with_conn(|conn| upsert(conn, &ft)).unwrap());

        let loaded = get(&db, "10144962").unwrap().unwrap();
        assert_eq!(loaded.claims_text, "1. A method...");
        assert_eq!(loaded.classification_codes, ft.classification_codes);
        assert_eq!(loaded.data_source, DataSource::Scrape);
        assert!(get(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_higher_priority_source_overwrites() {
        let db = test_db();
        db.with_conn(|conn| upsert(conn, &text("1", DataSource::Registry, "registry")))
            .unwrap();
        let written = db
            .with_conn(|conn| upsert(conn, &text("1", DataSource::Api, "api")))
            .unwrap();
        assert!(written);
        assert_eq!(get(&db, "1").unwrap().unwrap().claims_text, "api");
    }

    #[test]
    fn test_lower_priority_source_never_downgrades() {
        let db = test_db();
        db.with_conn(|conn| upsert(conn, &text("1", DataSource::Api, "api")))
            .unwrap();
        let written = db
            .with_conn(|conn| upsert(conn, &text("1", DataSource::Scrape, "scrape")))
            .unwrap();
        assert!(!written);
        let loaded = get(&db, "1").unwrap().unwrap();
        assert_eq!(loaded.claims_text, "api");
        assert_eq!(loaded.data_source, DataSource::Api);
    }
}

//! Patent repository: per-company `PatentRecord` rows.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{DataSource, PatentRecord, PatentStatus};

use super::{Database, DatabaseError};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "patent_id, company_key, title, abstract, filing_date, grant_date,
     status, source_of_record, full_text_present";

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(column: &'static str, value: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(&v, DATE_FORMAT).map_err(|e| DatabaseError::Decode {
                column,
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Columns exactly as stored, decoded in a second pass.
struct RawPatentRow {
    patent_id: String,
    company_key: String,
    title: Option<String>,
    abstract_text: Option<String>,
    filing_date: Option<String>,
    grant_date: Option<String>,
    status: String,
    source_of_record: Option<String>,
    full_text_present: bool,
}

fn map_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPatentRow> {
    Ok(RawPatentRow {
        patent_id: row.get(0)?,
        company_key: row.get(1)?,
        title: row.get(2)?,
        abstract_text: row.get(3)?,
        filing_date: row.get(4)?,
        grant_date: row.get(5)?,
        status: row.get(6)?,
        source_of_record: row.get(7)?,
        full_text_present: row.get::<_, i64>(8)? != 0,
    })
}

impl TryFrom<RawPatentRow> for PatentRecord {
    type Error = DatabaseError;

    fn try_from(raw: RawPatentRow) -> Result<Self, Self::Error> {
        let status = raw
            .status
            .parse::<PatentStatus>()
            .map_err(|reason| DatabaseError::Decode {
                column: "status",
                reason,
            })?;
        let source_of_record = raw
            .source_of_record
            .map(|s| s.parse::<DataSource>())
            .transpose()
            .map_err(|reason| DatabaseError::Decode {
                column: "source_of_record",
                reason,
            })?;

        Ok(PatentRecord {
            patent_id: raw.patent_id,
            company_key: raw.company_key,
            title: raw.title,
            abstract_text: raw.abstract_text,
            filing_date: parse_date("filing_date", raw.filing_date)?,
            grant_date: parse_date("grant_date", raw.grant_date)?,
            status,
            source_of_record,
            full_text_present: raw.full_text_present,
        })
    }
}

/// Inserts or replaces the enriched fields of a record.
pub fn upsert(conn: &Connection, record: &PatentRecord) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO patents (company_key, patent_id, title, abstract, filing_date, grant_date,
             status, source_of_record, full_text_present, first_seen_at, updated_at, last_attempt_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?10)
         ON CONFLICT(company_key, patent_id) DO UPDATE SET
           title = excluded.title,
           abstract = excluded.abstract,
           filing_date = excluded.filing_date,
           grant_date = excluded.grant_date,
           status = excluded.status,
           source_of_record = excluded.source_of_record,
           full_text_present = excluded.full_text_present,
           updated_at = excluded.updated_at,
           last_attempt_at = excluded.last_attempt_at",
        params![
            record.company_key,
            record.patent_id,
            record.title,
            record.abstract_text,
            format_date(record.filing_date),
            format_date(record.grant_date),
            record.status.as_str(),
            record.source_of_record.map(|s| s.as_str()),
            record.full_text_present as i64,
            now,
        ],
    )?;
    Ok(())
}

/// Records an unresolved attempt. Inserts an `unknown` placeholder when the
/// record is new; an existing record only gets its attempt timestamp bumped.
pub fn record_unresolved(
    conn: &Connection,
    company_key: &str,
    patent_id: &str,
) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO patents (company_key, patent_id, status, full_text_present,
             first_seen_at, updated_at, last_attempt_at)
         VALUES (?1, ?2, 'unknown', 0, ?3, ?3, ?3)
         ON CONFLICT(company_key, patent_id) DO UPDATE SET
           last_attempt_at = excluded.last_attempt_at",
        params![company_key, patent_id, now],
    )?;
    Ok(())
}

/// Finds one record.
pub fn get(
    db: &Database,
    company_key: &str,
    patent_id: &str,
) -> Result<Option<PatentRecord>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM patents WHERE company_key = ?1 AND patent_id = ?2",
                    SELECT_COLUMNS
                ),
                params![company_key, patent_id],
                map_raw,
            )
            .optional()?;
        Ok(raw)
    })?;
    raw.map(PatentRecord::try_from).transpose()
}

/// All records of a company, ordered by patent id.
pub fn list_for_company(db: &Database, company_key: &str) -> Result<Vec<PatentRecord>, DatabaseError> {
    let raws = db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patents WHERE company_key = ?1 ORDER BY patent_id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![company_key], map_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    raws.into_iter().map(PatentRecord::try_from).collect()
}

/// Records still lacking full text or still pending a grant decision.
pub fn list_unsettled(db: &Database, company_key: &str) -> Result<Vec<PatentRecord>, DatabaseError> {
    let raws = db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patents
             WHERE company_key = ?1 AND (status = 'pending' OR full_text_present = 0)
             ORDER BY patent_id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![company_key], map_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    raws.into_iter().map(PatentRecord::try_from).collect()
}

/// The most recently updated record of `patent_id` holding full text, under
/// any company. Co-assigned patents share bibliographic data this way.
pub fn find_enriched(db: &Database, patent_id: &str) -> Result<Option<PatentRecord>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM patents
                     WHERE patent_id = ?1 AND full_text_present = 1
                     ORDER BY updated_at DESC, company_key
                     LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![patent_id],
                map_raw,
            )
            .optional()?;
        Ok(raw)
    })?;
    raw.map(PatentRecord::try_from).transpose()
}

/// Number of records held for a company.
pub fn count_for_company(db: &Database, company_key: &str) -> Result<u32, DatabaseError> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM patents WHERE company_key = ?1",
            params![company_key],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

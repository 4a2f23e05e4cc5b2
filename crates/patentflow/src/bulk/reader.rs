//! Streaming reader for the delimited assignee dataset.
//!
//! Accepts a zip archive holding one delimited file, or the bare delimited
//! file. Rows are handed out in bounded chunks so the dataset is never held
//! in memory as a whole.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::config::ColumnConfig;
use crate::db::assignee_repo::NewAssignee;
use crate::error::IndexError;
use crate::normalize::normalize_name;

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
const DATA_EXTENSIONS: &[&str] = &[".tsv", ".csv", ".txt"];
/// Corrupt rows logged individually before the reader goes quiet.
const CORRUPT_LOG_LIMIT: u64 = 20;

/// How to read the dataset.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub columns: ColumnConfig,
    pub delimiter: u8,
    pub chunk_size: usize,
    /// Data records already consumed by an earlier, interrupted load.
    pub skip_records: u64,
}

/// One bounded slice of the dataset.
#[derive(Debug, Default)]
pub struct Chunk {
    /// Zero-based chunk position, counting chunks skipped on resume.
    pub index: u64,
    pub rows: Vec<NewAssignee>,
    pub rows_read: u64,
    pub rows_corrupt: u64,
}

#[derive(Debug, Clone, Copy)]
struct ColumnPositions {
    patent_id: usize,
    assignee_id: usize,
    name: usize,
}

/// Streams the dataset at `path`, calling `on_chunk` for each chunk in order.
///
/// Chunk indexes continue from `skip_records / chunk_size` so resumed loads
/// keep stable numbering.
pub fn read_chunks<F>(path: &Path, options: &ReaderOptions, on_chunk: F) -> Result<(), IndexError>
where
    F: FnMut(Chunk) -> Result<(), IndexError>,
{
    let mut file = File::open(path).map_err(|e| IndexError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if is_zip(&mut file, path)? {
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| IndexError::unavailable(path.display().to_string(), e))?;
        let entry_index = find_data_entry(&mut archive, path)?;
        let entry = archive
            .by_index(entry_index)
            .map_err(|e| IndexError::unavailable(path.display().to_string(), e))?;
        stream_rows(entry, options, on_chunk)
    } else {
        stream_rows(BufReader::new(file), options, on_chunk)
    }
}

fn is_zip(file: &mut File, path: &Path) -> Result<bool, IndexError> {
    let io_err = |e| IndexError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic).map_err(io_err)?;
    file.rewind().map_err(io_err)?;
    Ok(read == magic.len() && &magic == ZIP_MAGIC)
}

/// First file entry with a delimited-text extension, else the first file.
fn find_data_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &Path,
) -> Result<usize, IndexError> {
    let mut first_file = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| IndexError::unavailable(path.display().to_string(), e))?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_ascii_lowercase();
        if DATA_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            return Ok(i);
        }
        first_file.get_or_insert(i);
    }
    first_file.ok_or_else(|| {
        IndexError::unavailable(path.display().to_string(), "archive contains no files")
    })
}

fn stream_rows<R, F>(reader: R, options: &ReaderOptions, mut on_chunk: F) -> Result<(), IndexError>
where
    R: Read,
    F: FnMut(Chunk) -> Result<(), IndexError>,
{
    let chunk_size = options.chunk_size.max(1);
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.byte_headers().map_err(csv_to_index_error)?.clone();
    let positions = locate_columns(&headers, &options.columns)?;

    let mut record = csv::ByteRecord::new();
    let mut record_no: u64 = 0;
    let mut chunk = Chunk {
        index: options.skip_records / chunk_size as u64,
        ..Chunk::default()
    };
    let mut corrupt_total: u64 = 0;

    loop {
        let has_record = match csv_reader.read_byte_record(&mut record) {
            Ok(has_record) => has_record,
            Err(e) if e.is_io_error() => return Err(csv_to_index_error(e)),
            Err(e) => {
                // Malformed framing; the reader resynchronizes on the next line.
                record_no += 1;
                if record_no > options.skip_records {
                    chunk.rows_read += 1;
                    chunk.rows_corrupt += 1;
                    corrupt_total += 1;
                    log_corrupt(corrupt_total, record_no, &e.to_string());
                }
                flush_if_full(&mut chunk, chunk_size, &mut on_chunk)?;
                continue;
            }
        };
        if !has_record {
            break;
        }

        record_no += 1;
        if record_no <= options.skip_records {
            continue;
        }

        chunk.rows_read += 1;
        match parse_row(&record, positions, record_no) {
            Ok(row) => chunk.rows.push(row),
            Err(IndexError::CorruptData { row, reason }) => {
                chunk.rows_corrupt += 1;
                corrupt_total += 1;
                log_corrupt(corrupt_total, row, &reason);
            }
            Err(other) => return Err(other),
        }

        flush_if_full(&mut chunk, chunk_size, &mut on_chunk)?;
    }

    if chunk.rows_read > 0 {
        on_chunk(chunk)?;
    }

    if corrupt_total > CORRUPT_LOG_LIMIT {
        log::warn!("{} corrupt rows skipped in total", corrupt_total);
    }

    Ok(())
}

fn flush_if_full<F>(chunk: &mut Chunk, chunk_size: usize, on_chunk: &mut F) -> Result<(), IndexError>
where
    F: FnMut(Chunk) -> Result<(), IndexError>,
{
    if chunk.rows_read as usize >= chunk_size {
        let next = Chunk {
            index: chunk.index + 1,
            ..Chunk::default()
        };
        on_chunk(std::mem::replace(chunk, next))?;
    }
    Ok(())
}

fn log_corrupt(seen: u64, row: u64, reason: &str) {
    if seen <= CORRUPT_LOG_LIMIT {
        log::warn!("Skipping corrupt row {}: {}", row, reason);
    }
}

fn locate_columns(
    headers: &csv::ByteRecord,
    columns: &ColumnConfig,
) -> Result<ColumnPositions, IndexError> {
    let find = |wanted: &str| {
        headers
            .iter()
            .position(|h| trim_header(h) == wanted.as_bytes())
            .ok_or_else(|| IndexError::MissingColumn(wanted.to_string()))
    };
    Ok(ColumnPositions {
        patent_id: find(&columns.patent_id)?,
        assignee_id: find(&columns.assignee_id)?,
        name: find(&columns.name)?,
    })
}

/// Strips surrounding whitespace and a UTF-8 byte order mark.
fn trim_header(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    raw.trim_ascii()
}

/// Validates one data record. `row` is its 1-based position after the header.
fn parse_row(
    record: &csv::ByteRecord,
    positions: ColumnPositions,
    row: u64,
) -> Result<NewAssignee, IndexError> {
    let field = |idx: usize, column: &str| -> Result<&str, IndexError> {
        let raw = record.get(idx).ok_or_else(|| IndexError::CorruptData {
            row,
            reason: format!("missing field '{}'", column),
        })?;
        let text = std::str::from_utf8(raw).map_err(|_| IndexError::CorruptData {
            row,
            reason: format!("field '{}' is not valid UTF-8", column),
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(IndexError::CorruptData {
                row,
                reason: format!("field '{}' is empty", column),
            });
        }
        Ok(text)
    };

    let patent_id = field(positions.patent_id, "patent_id")?;
    let assignee_id = field(positions.assignee_id, "assignee_id")?;
    let raw_name = field(positions.name, "name")?;

    if !patent_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(IndexError::CorruptData {
            row,
            reason: format!("malformed patent id '{}'", patent_id),
        });
    }

    let normalized_name = normalize_name(raw_name);
    if normalized_name.is_empty() {
        return Err(IndexError::CorruptData {
            row,
            reason: format!("name '{}' normalizes to nothing", raw_name),
        });
    }

    Ok(NewAssignee {
        assignee_id: assignee_id.to_string(),
        raw_name: raw_name.to_string(),
        normalized_name,
        patent_id: patent_id.to_string(),
    })
}

fn csv_to_index_error(e: csv::Error) -> IndexError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => IndexError::Io {
            path: "<dataset>".into(),
            source: io,
        },
        other => IndexError::CorruptData {
            row: 0,
            reason: format!("unreadable header: {:?}", other),
        },
    }
}

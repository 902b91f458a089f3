//! Job-log file decoding.
//!
//! Turns delimited-text, spreadsheet, JSON and JSON Lines files into
//! [`RawRow`]s for the ingestion pipeline. Any failure here is a hard error: a file that cannot be
//! decoded never reaches the aggregator.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use jobstats_core::error::{JobStatsError, Result};
use jobstats_core::models::{CellValue, RawRow};
use serde_json::{Map, Value};
use tracing::debug;

// ── FileKind ──────────────────────────────────────────────────────────────────

/// The decoders available for job-log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Delimited text with a header row.
    Delimited { delimiter: u8 },
    /// The first worksheet of an Excel or OpenDocument workbook.
    Spreadsheet,
    /// A JSON array of row objects.
    Json,
    /// One JSON row object per line.
    JsonLines,
}

impl FileKind {
    pub const CSV: FileKind = FileKind::Delimited { delimiter: b',' };
    pub const TSV: FileKind = FileKind::Delimited { delimiter: b'\t' };

    /// Pick a decoder from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "txt" => Ok(Self::CSV),
            "tsv" => Ok(Self::TSV),
            "json" => Ok(FileKind::Json),
            "jsonl" | "ndjson" => Ok(FileKind::JsonLines),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileKind::Spreadsheet),
            _ => Err(JobStatsError::UnsupportedFileType(path.display().to_string())),
        }
    }

    /// Map a `--kind` name to a decoder. `"auto"` is not handled here.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::CSV),
            "tsv" => Some(Self::TSV),
            "xlsx" | "spreadsheet" => Some(FileKind::Spreadsheet),
            "json" => Some(FileKind::Json),
            "jsonl" | "ndjson" => Some(FileKind::JsonLines),
            _ => None,
        }
    }

    /// Resolve a `--kind` setting against `path`: `"auto"` detects from the
    /// extension, anything else must be a known decoder name.
    pub fn resolve(name: &str, path: &Path) -> Result<Self> {
        if name.eq_ignore_ascii_case("auto") {
            return Self::from_path(path);
        }
        Self::from_name(name)
            .ok_or_else(|| JobStatsError::Config(format!("unknown input kind \"{}\"", name)))
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read `path` and decode it as `kind`.
pub async fn read_rows(path: &Path, kind: FileKind) -> Result<Vec<RawRow>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| JobStatsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    let rows = decode_bytes(&bytes, kind)?;
    debug!(
        "Decoded {} rows from {} ({} bytes, {:?})",
        rows.len(),
        path.display(),
        bytes.len(),
        kind
    );
    Ok(rows)
}

/// Decode an in-memory file body.
pub fn decode_bytes(bytes: &[u8], kind: FileKind) -> Result<Vec<RawRow>> {
    match kind {
        FileKind::Delimited { delimiter } => decode_delimited(bytes, delimiter),
        FileKind::Spreadsheet => decode_spreadsheet(bytes),
        FileKind::Json => decode_json(bytes),
        FileKind::JsonLines => decode_json_lines(bytes),
    }
}

// ── Decoders ──────────────────────────────────────────────────────────────────

/// Header row first; short rows simply lack the trailing columns and every
/// non-empty cell is text. The csv reader drops empty lines, but a line of
/// separators or whitespace is still a row.
fn decode_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.as_str(), cell_from_text(field)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// The first worksheet only. Its first row is the header; columns with a
/// blank header and fully blank rows are skipped. Date cells come through as
/// serial numbers so the normalizer sees them the same way in every format.
fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| JobStatsError::Decode(format!("unreadable workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| JobStatsError::Decode("workbook has no worksheets".to_string()))?
        .map_err(|e| JobStatsError::Decode(format!("unreadable worksheet: {}", e)))?;

    let mut lines = range.rows();
    let Some(header_row) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        let row: RawRow = headers
            .iter()
            .zip(line)
            .filter(|(header, _)| !header.is_empty())
            .filter_map(|(header, cell)| cell_from_sheet(cell).map(|c| (header.as_str(), c)))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn decode_json(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = value else {
        return Err(JobStatsError::Decode(
            "expected a top-level array of row objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(row_from_object(map)),
            other => Err(JobStatsError::Decode(format!(
                "item {}: expected an object, found {}",
                i + 1,
                json_type_name(&other)
            ))),
        })
        .collect()
}

fn decode_json_lines(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| JobStatsError::Decode(format!("input is not valid UTF-8: {}", e)))?;

    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| JobStatsError::Decode(format!("line {}: {}", i + 1, e)))?;
        match value {
            Value::Object(map) => rows.push(row_from_object(map)),
            other => {
                return Err(JobStatsError::Decode(format!(
                    "line {}: expected an object, found {}",
                    i + 1,
                    json_type_name(&other)
                )))
            }
        }
    }
    Ok(rows)
}

// ── Cell conversion ───────────────────────────────────────────────────────────

fn cell_from_text(field: &str) -> CellValue {
    if field.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(field.to_string())
    }
}

/// Empty and error cells are left out of the row entirely.
fn cell_from_sheet(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::String(s) => Some(cell_from_text(s)),
        Data::Bool(b) => Some(CellValue::Text(b.to_string())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(cell_from_text(s)),
    }
}

fn row_from_object(map: Map<String, Value>) -> RawRow {
    map.into_iter()
        .map(|(key, value)| (key, cell_from_json(value)))
        .collect()
}

/// Strings stay text, numbers stay numeric (so spreadsheet serials survive),
/// anything structured is kept as its JSON text.
fn cell_from_json(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(s) => cell_from_text(&s),
        Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        other @ (Value::Bool(_) | Value::Array(_) | Value::Object(_)) => {
            CellValue::Text(other.to_string())
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

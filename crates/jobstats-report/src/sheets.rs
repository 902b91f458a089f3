//! Tabular export of a [`ProjectedResult`].
//!
//! A run is laid out as a small workbook of named sheets, written as a single
//! `.xlsx` file. The whole result can also be dumped as JSON.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::anyhow;
use jobstats_core::error::{JobStatsError, Result};
use jobstats_core::formatting::format_percentage;
use jobstats_core::models::{ProjectedResult, AGENT_NAME, JOB_NAME};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{debug, info};

pub const JOB_FREQUENCY: &str = "Job Frequency";
pub const AGENT_FREQUENCY: &str = "Agent Frequency";
pub const AVERAGE_DURATIONS: &str = "Average Durations";
pub const STATISTICS: &str = "Statistics";
pub const ERRORS: &str = "Errors";

/// Columns are never narrower than this, header included.
const MIN_COLUMN_WIDTH: usize = 10;
const COLUMN_PADDING: usize = 2;

const DECIMAL_FORMAT: &str = "0.00";

// ── Sheet ─────────────────────────────────────────────────────────────────────

/// A single data cell. Numbers stay numeric in the exported workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Text(String),
    Count(u64),
    /// Shown with two decimal places.
    Decimal(f64),
}

impl fmt::Display for SheetCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetCell::Text(s) => f.pad(s),
            SheetCell::Count(n) => f.pad(&n.to_string()),
            SheetCell::Decimal(v) => f.pad(&format!("{v:.2}")),
        }
    }
}

impl From<&str> for SheetCell {
    fn from(s: &str) -> Self {
        SheetCell::Text(s.to_string())
    }
}

impl From<String> for SheetCell {
    fn from(s: String) -> Self {
        SheetCell::Text(s)
    }
}

impl From<u64> for SheetCell {
    fn from(n: u64) -> Self {
        SheetCell::Count(n)
    }
}

impl PartialEq<&str> for SheetCell {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

/// One named table: a text header row plus typed data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

impl Sheet {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<SheetCell>) {
        self.rows.push(row);
    }

    /// Displayed width of every cell, header row first.
    fn cell_widths(&self) -> Vec<Vec<usize>> {
        std::iter::once(self.header.iter().map(|h| h.chars().count()).collect())
            .chain(self.rows.iter().map(|row| {
                row.iter()
                    .map(|cell| cell.to_string().chars().count())
                    .collect()
            }))
            .collect()
    }
}

// ── Sheet builders ────────────────────────────────────────────────────────────

pub fn job_frequency_sheet(result: &ProjectedResult) -> Sheet {
    let mut sheet = Sheet::new(JOB_FREQUENCY, &[JOB_NAME, "Frequency"]);
    for (name, frequency, _) in result.jobs() {
        sheet.push_row(vec![name.into(), frequency.into()]);
    }
    sheet
}

pub fn agent_frequency_sheet(result: &ProjectedResult) -> Sheet {
    let mut sheet = Sheet::new(AGENT_FREQUENCY, &[AGENT_NAME, "Frequency"]);
    for (name, frequency) in result.agents() {
        sheet.push_row(vec![name.into(), frequency.into()]);
    }
    sheet
}

pub fn average_durations_sheet(result: &ProjectedResult) -> Sheet {
    let mut sheet = Sheet::new(AVERAGE_DURATIONS, &[JOB_NAME, "Average Duration (minutes)"]);
    for (name, _, average) in result.jobs() {
        sheet.push_row(vec![name.into(), SheetCell::Decimal(average)]);
    }
    sheet
}

pub fn statistics_sheet(result: &ProjectedResult) -> Sheet {
    let stats = &result.statistics;
    let mut sheet = Sheet::new(STATISTICS, &["Metric", "Value"]);
    sheet.push_row(vec!["Total Rows".into(), (stats.total_rows as u64).into()]);
    sheet.push_row(vec!["Processed Rows".into(), (stats.processed_rows as u64).into()]);
    sheet.push_row(vec!["Error Rows".into(), (stats.error_rows as u64).into()]);
    sheet.push_row(vec![
        "Success Rate".into(),
        format_percentage(stats.success_rate).into(),
    ]);
    sheet
}

pub fn errors_sheet(result: &ProjectedResult) -> Sheet {
    let mut sheet = Sheet::new(ERRORS, &["Row", JOB_NAME, "Reason"]);
    for error in &result.errors {
        sheet.push_row(vec![
            (error.row as u64).into(),
            error.job_name.as_str().into(),
            error.reason.as_str().into(),
        ]);
    }
    sheet
}

/// Every sheet for `result`, in workbook order.
pub fn workbook(result: &ProjectedResult) -> Vec<Sheet> {
    vec![
        job_frequency_sheet(result),
        agent_frequency_sheet(result),
        average_durations_sheet(result),
        statistics_sheet(result),
        errors_sheet(result),
    ]
}

/// Display width per column: the longest cell (header included, at least
/// [`MIN_COLUMN_WIDTH`]) plus padding.
pub fn column_widths(sheet: &Sheet) -> Vec<usize> {
    let widths = sheet.cell_widths();
    let columns = widths.iter().map(Vec::len).max().unwrap_or(0);
    (0..columns)
        .map(|col| {
            let longest = widths
                .iter()
                .filter_map(|row| row.get(col))
                .copied()
                .max()
                .unwrap_or(0);
            longest.max(MIN_COLUMN_WIDTH) + COLUMN_PADDING
        })
        .collect()
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Write every sheet into one `.xlsx` workbook at `path`, in order.
///
/// Headers are bold and frozen, and column widths follow [`column_widths`].
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let mut workbook = Workbook::new();
    let formats = CellFormats {
        header: Format::new().set_bold(),
        decimal: Format::new().set_num_format(DECIMAL_FORMAT),
    };

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        fill_worksheet(worksheet, sheet, &formats).map_err(|e| xlsx_error(path, e))?;
    }
    workbook.save(path).map_err(|e| xlsx_error(path, e))?;

    info!("Exported {} sheets to {}", sheets.len(), path.display());
    Ok(())
}

/// Serialise the full result, errors included, as pretty JSON.
pub fn write_json(path: &Path, result: &ProjectedResult) -> Result<()> {
    let write_err = |source| JobStatsError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush().map_err(write_err)?;
    info!("Exported JSON summary to {}", path.display());
    Ok(())
}

struct CellFormats {
    header: Format,
    decimal: Format,
}

fn fill_worksheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    formats: &CellFormats,
) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(sheet.name.as_str())?;

    for (col, title) in sheet.header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title.as_str(), &formats.header)?;
    }
    for (index, row) in sheet.rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                SheetCell::Text(s) => worksheet.write_string(line, col, s.as_str())?,
                SheetCell::Count(n) => worksheet.write_number(line, col, *n as f64)?,
                SheetCell::Decimal(v) => {
                    worksheet.write_number_with_format(line, col, *v, &formats.decimal)?
                }
            };
        }
    }
    for (col, width) in column_widths(sheet).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    debug!("Filled sheet \"{}\" ({} rows)", sheet.name, sheet.rows.len());
    Ok(())
}

fn xlsx_error(path: &Path, error: XlsxError) -> JobStatsError {
    match error {
        XlsxError::IoError(source) => JobStatsError::FileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => JobStatsError::Other(anyhow!("workbook {}: {}", path.display(), other)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

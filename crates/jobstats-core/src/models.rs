use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::formatting::percentage;

// ── Column names ──────────────────────────────────────────────────────────────

/// Column holding the job name.
pub const JOB_NAME: &str = "Job Name";
/// Column holding the agent (executor) name.
pub const AGENT_NAME: &str = "Agent Name";
/// Column holding the execution start time.
pub const START_TIME: &str = "Start Time";
/// Column holding the execution end time.
pub const END_TIME: &str = "End Time";

/// Label recorded on a [`ProcessingError`] when the row has no job name.
pub const UNKNOWN_JOB: &str = "Unknown";

// ── CellValue ─────────────────────────────────────────────────────────────────

/// One cell of a decoded input row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing or blank cell.
    #[default]
    Empty,
    /// Free text, as read from a delimited file or a JSON string.
    Text(String),
    /// Numeric cell; for time columns this is a spreadsheet serial date.
    Number(f64),
    /// A cell that already carries an absolute instant.
    Instant(DateTime<Utc>),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Textual view of the cell, used for name columns.
    ///
    /// Numbers render in their shortest form (`42`, `1.5`). Empty cells and
    /// instants have no name-like text.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Number(n) => Some(Cow::Owned(n.to_string())),
            CellValue::Empty | CellValue::Instant(_) => None,
        }
    }

    /// Classify the cell for date normalisation. `Empty` has no date shape.
    pub fn as_date_like(&self) -> Option<DateLike<'_>> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(DateLike::Text(s)),
            CellValue::Number(n) => Some(DateLike::SerialNumber(*n)),
            CellValue::Instant(dt) => Some(DateLike::NativeInstant(*dt)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(dt: DateTime<Utc>) -> Self {
        CellValue::Instant(dt)
    }
}

// ── DateLike ──────────────────────────────────────────────────────────────────

/// The closed set of shapes a date cell can take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateLike<'a> {
    NativeInstant(DateTime<Utc>),
    Text(&'a str),
    /// Day count since the spreadsheet epoch (1899-12-30), fractional part
    /// being the time of day.
    SerialNumber(f64),
}

// ── RawRow ────────────────────────────────────────────────────────────────────

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A decoded input record: column name → cell.
///
/// Columns are kept sorted by name so that diagnostics serialise
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, CellValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for constructing rows in code.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    /// Cell for `column`, or [`CellValue::Empty`] when the column is absent.
    pub fn cell(&self, column: &str) -> &CellValue {
        self.0.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRow(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ── Aggregate records ─────────────────────────────────────────────────────────

/// Running totals for one job name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobRecord {
    /// Number of accepted rows for this job.
    pub count: u64,
    /// Sum of per-row durations, in minutes.
    pub total_duration_minutes: f64,
}

impl JobRecord {
    pub fn add_occurrence(&mut self, duration_minutes: f64) {
        self.count += 1;
        self.total_duration_minutes += duration_minutes;
    }

    /// Mean duration in minutes. A record only exists after its first
    /// occurrence, so `count` is at least one here in practice.
    pub fn average_duration(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_duration_minutes / self.count as f64
    }
}

/// Running totals for one agent name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentRecord {
    pub count: u64,
}

impl AgentRecord {
    pub fn add_occurrence(&mut self) {
        self.count += 1;
    }
}

// ── Row rejection ─────────────────────────────────────────────────────────────

/// Why a row was not folded into the aggregates.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRejection {
    #[error("job or agent name missing")]
    MissingName,

    #[error("invalid dates")]
    InvalidDates,

    /// Only raised when negative durations are configured to be rejected.
    #[error("negative duration")]
    NegativeDuration,
}

/// Diagnostic record for one rejected row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingError {
    /// 1-based position of the row in the input sequence.
    pub row: usize,
    /// Job name as it appeared in the row, or [`UNKNOWN_JOB`].
    pub job_name: String,
    pub kind: RowRejection,
    /// Human-readable reason, the display form of `kind`.
    pub reason: String,
    /// The offending row, untouched.
    pub data: RawRow,
}

impl ProcessingError {
    pub fn new(row: usize, job_name: impl Into<String>, kind: RowRejection, data: RawRow) -> Self {
        Self {
            row,
            job_name: job_name.into(),
            kind,
            reason: kind.to_string(),
            data,
        }
    }
}

// ── RunStatistics ─────────────────────────────────────────────────────────────

/// Row counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub error_rows: usize,
    /// `processed_rows / total_rows` as a percentage rounded to two
    /// decimals; `0.0` for an empty run.
    pub success_rate: f64,
}

impl RunStatistics {
    pub fn from_counts(processed_rows: usize, error_rows: usize) -> Self {
        let total_rows = processed_rows + error_rows;
        Self {
            total_rows,
            processed_rows,
            error_rows,
            success_rate: percentage(processed_rows as f64, total_rows as f64, 2),
        }
    }

    /// Success rate with exactly two decimals, e.g. `"66.67"` or `"0.00"`.
    pub fn success_rate_label(&self) -> String {
        format!("{:.2}", self.success_rate)
    }
}

// ── ProjectedResult ───────────────────────────────────────────────────────────

/// Ranked, read-only summary of one ingestion run.
///
/// `job_names`, `job_frequencies` and `average_durations` are index-aligned
/// and ordered by descending frequency; `agent_names` and
/// `agent_frequencies` likewise.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectedResult {
    pub job_names: Vec<String>,
    pub job_frequencies: Vec<u64>,
    pub agent_names: Vec<String>,
    pub agent_frequencies: Vec<u64>,
    /// Mean duration in minutes per job, aligned with `job_names`.
    pub average_durations: Vec<f64>,
    pub statistics: RunStatistics,
    pub errors: Vec<ProcessingError>,
}

impl ProjectedResult {
    /// `(name, frequency, average duration)` per job, in ranked order.
    pub fn jobs(&self) -> impl Iterator<Item = (&str, u64, f64)> + '_ {
        self.job_names
            .iter()
            .zip(&self.job_frequencies)
            .zip(&self.average_durations)
            .map(|((name, freq), avg)| (name.as_str(), *freq, *avg))
    }

    /// `(name, frequency)` per agent, in ranked order.
    pub fn agents(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.agent_names
            .iter()
            .zip(&self.agent_frequencies)
            .map(|(name, freq)| (name.as_str(), *freq))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── CellValue ─────────────────────────────────────────────────────────────

    #[test]
    fn test_cell_as_text() {
        assert_eq!(CellValue::from("Backup").as_text().as_deref(), Some("Backup"));
        assert_eq!(CellValue::from(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(CellValue::from(1.5).as_text().as_deref(), Some("1.5"));
        assert!(CellValue::Empty.as_text().is_none());
    }

    #[test]
    fn test_cell_as_date_like() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            CellValue::from(dt).as_date_like(),
            Some(DateLike::NativeInstant(dt))
        );
        assert_eq!(
            CellValue::from(45000.0).as_date_like(),
            Some(DateLike::SerialNumber(45000.0))
        );
        assert_eq!(
            CellValue::from("x").as_date_like(),
            Some(DateLike::Text("x"))
        );
        assert!(CellValue::Empty.as_date_like().is_none());
    }

    #[test]
    fn test_cell_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            CellValue::Empty,
            CellValue::from("a"),
            CellValue::from(2.5),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,"a",2.5]"#);
    }

    // ── RawRow ────────────────────────────────────────────────────────────────

    #[test]
    fn test_raw_row_missing_column_is_empty() {
        let row = RawRow::new().with(JOB_NAME, "Backup");
        assert_eq!(row.cell(JOB_NAME), &CellValue::from("Backup"));
        assert!(row.cell(AGENT_NAME).is_empty());
        assert!(row.get(AGENT_NAME).is_none());
    }

    #[test]
    fn test_raw_row_from_iter() {
        let row: RawRow = [(JOB_NAME, "Backup"), (AGENT_NAME, "A1")]
            .into_iter()
            .collect();
        assert_eq!(row.len(), 2);
        let cols: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(cols, vec![AGENT_NAME, JOB_NAME]);
    }

    // ── Records ───────────────────────────────────────────────────────────────

    #[test]
    fn test_job_record_average() {
        let mut job = JobRecord::default();
        job.add_occurrence(30.0);
        job.add_occurrence(90.0);
        assert_eq!(job.count, 2);
        assert_eq!(job.total_duration_minutes, 120.0);
        assert_eq!(job.average_duration(), 60.0);
    }

    // ── RowRejection / ProcessingError ───────────────────────────────────────

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(RowRejection::MissingName.to_string(), "job or agent name missing");
        assert_eq!(RowRejection::InvalidDates.to_string(), "invalid dates");
        assert_eq!(RowRejection::NegativeDuration.to_string(), "negative duration");
    }

    #[test]
    fn test_processing_error_reason_follows_kind() {
        let err = ProcessingError::new(3, UNKNOWN_JOB, RowRejection::InvalidDates, RawRow::new());
        assert_eq!(err.reason, "invalid dates");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "invalid_dates");
        assert_eq!(json["row"], 3);
    }

    // ── RunStatistics ─────────────────────────────────────────────────────────

    #[test]
    fn test_statistics_from_counts() {
        let stats = RunStatistics::from_counts(2, 1);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.success_rate_label(), "66.67");
    }

    #[test]
    fn test_statistics_empty_run_is_zero() {
        let stats = RunStatistics::from_counts(0, 0);
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.success_rate_label(), "0.00");
    }

    // ── ProjectedResult ───────────────────────────────────────────────────────

    #[test]
    fn test_projected_result_iterators_zip() {
        let result = ProjectedResult {
            job_names: vec!["Backup".into(), "Sync".into()],
            job_frequencies: vec![3, 1],
            average_durations: vec![10.0, 5.0],
            agent_names: vec!["A1".into()],
            agent_frequencies: vec![4],
            ..Default::default()
        };
        let jobs: Vec<_> = result.jobs().collect();
        assert_eq!(jobs, vec![("Backup", 3, 10.0), ("Sync", 1, 5.0)]);
        let agents: Vec<_> = result.agents().collect();
        assert_eq!(agents, vec![("A1", 4)]);
    }
}

//! Row validation and running per-job / per-agent tallies.
//!
//! [`RowAggregator`] folds one [`RawRow`] at a time into an
//! [`AggregationState`]. A row that fails validation is recorded as a
//! [`ProcessingError`] and the fold carries on; nothing here returns an error.

use std::borrow::Cow;
use std::collections::HashMap;

use jobstats_core::dates::DateNormalizer;
use jobstats_core::models::{
    AgentRecord, CellValue, JobRecord, ProcessingError, RawRow, RowRejection, RunStatistics,
    AGENT_NAME, END_TIME, JOB_NAME, START_TIME, UNKNOWN_JOB,
};
use jobstats_core::settings::PipelineConfig;
use tracing::debug;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

// ── Tally ─────────────────────────────────────────────────────────────────────

/// Name → record map that remembers first-seen order, so that equal counts
/// rank deterministically.
#[derive(Debug, Clone)]
pub struct Tally<R> {
    entries: Vec<(String, R)>,
    index: HashMap<String, usize>,
}

impl<R> Default for Tally<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Default> Tally<R> {
    /// Record for `name`, created with `R::default()` on first use.
    pub fn entry(&mut self, name: &str) -> &mut R {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.entries.push((name.to_string(), R::default()));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.entries[idx].1
    }
}

impl<R> Tally<R> {
    pub fn get(&self, name: &str) -> Option<&R> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.entries.iter().map(|(name, record)| (name.as_str(), record))
    }
}

// ── AggregationState ──────────────────────────────────────────────────────────

/// Everything accumulated during one pass over the input rows.
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    jobs: Tally<JobRecord>,
    agents: Tally<AgentRecord>,
    errors: Vec<ProcessingError>,
    total_rows: usize,
    processed_rows: usize,
    error_rows: usize,
}

impl AggregationState {
    pub fn jobs(&self) -> &Tally<JobRecord> {
        &self.jobs
    }

    pub fn agents(&self) -> &Tally<AgentRecord> {
        &self.agents
    }

    /// Rejected rows, in input order.
    pub fn errors(&self) -> &[ProcessingError] {
        &self.errors
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn processed_rows(&self) -> usize {
        self.processed_rows
    }

    pub fn error_rows(&self) -> usize {
        self.error_rows
    }

    /// Counters plus the derived success rate.
    pub fn statistics(&self) -> RunStatistics {
        debug_assert_eq!(self.total_rows, self.processed_rows + self.error_rows);
        RunStatistics::from_counts(self.processed_rows, self.error_rows)
    }
}

// ── RowAggregator ─────────────────────────────────────────────────────────────

/// A row that passed validation, ready to be folded in.
struct AcceptedRow {
    job: String,
    agent: String,
    duration_minutes: f64,
}

/// Validates rows and folds them into an owned [`AggregationState`].
pub struct RowAggregator {
    normalizer: DateNormalizer,
    reject_negative_durations: bool,
    state: AggregationState,
}

impl RowAggregator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_normalizer(
            DateNormalizer::new(&config.timezone),
            config.reject_negative_durations,
        )
    }

    pub fn with_normalizer(normalizer: DateNormalizer, reject_negative_durations: bool) -> Self {
        Self {
            normalizer,
            reject_negative_durations,
            state: AggregationState::default(),
        }
    }

    /// Validate `row` and fold it into the tallies.
    ///
    /// Returns `true` when the row was accepted. A rejected row is appended
    /// to the error log instead. Either way the row counts towards
    /// `total_rows` exactly once.
    pub fn process_row(&mut self, row: &RawRow) -> bool {
        let accepted = match self.validate(row) {
            Ok(accepted) => {
                self.state
                    .jobs
                    .entry(&accepted.job)
                    .add_occurrence(accepted.duration_minutes);
                self.state.agents.entry(&accepted.agent).add_occurrence();
                self.state.processed_rows += 1;
                true
            }
            Err(kind) => {
                self.reject(row, kind);
                false
            }
        };
        self.state.total_rows += 1;
        accepted
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn into_state(self) -> AggregationState {
        self.state
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn validate(&self, row: &RawRow) -> Result<AcceptedRow, RowRejection> {
        let job = required_name(row.cell(JOB_NAME));
        let agent = required_name(row.cell(AGENT_NAME));
        let (Some(job), Some(agent)) = (job, agent) else {
            return Err(RowRejection::MissingName);
        };

        let start = self.normalizer.normalize(row.cell(START_TIME));
        let end = self.normalizer.normalize(row.cell(END_TIME));
        let (Some(start), Some(end)) = (start, end) else {
            return Err(RowRejection::InvalidDates);
        };

        let duration_minutes = (end - start).num_milliseconds() as f64 / MILLIS_PER_MINUTE;
        if self.reject_negative_durations && duration_minutes < 0.0 {
            return Err(RowRejection::NegativeDuration);
        }

        Ok(AcceptedRow {
            job,
            agent,
            duration_minutes,
        })
    }

    fn reject(&mut self, row: &RawRow, kind: RowRejection) {
        let position = self.state.total_rows + 1;
        let job_name = job_label(row);
        debug!("Row {} ({}) rejected: {}", position, job_name, kind);

        self.state
            .errors
            .push(ProcessingError::new(position, job_name, kind, row.clone()));
        self.state.error_rows += 1;
    }
}

/// Name-like text of a cell. A zero or NaN number is no name at all.
fn name_text(cell: &CellValue) -> Option<Cow<'_, str>> {
    match cell {
        CellValue::Number(n) if *n == 0.0 || n.is_nan() => None,
        other => other.as_text(),
    }
}

/// Trimmed, non-empty name text, or `None`.
fn required_name(cell: &CellValue) -> Option<String> {
    let text = name_text(cell)?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Job name exactly as written in the row, for diagnostics.
fn job_label(row: &RawRow) -> String {
    match name_text(row.cell(JOB_NAME)) {
        Some(text) if !text.is_empty() => text.into_owned(),
        _ => UNKNOWN_JOB.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_row(job: &str, agent: &str, start: &str, end: &str) -> RawRow {
        RawRow::new()
            .with(JOB_NAME, job)
            .with(AGENT_NAME, agent)
            .with(START_TIME, start)
            .with(END_TIME, end)
    }

    fn aggregator() -> RowAggregator {
        RowAggregator::new(&PipelineConfig::default())
    }

    // ── Accepted rows ─────────────────────────────────────────────────────────

    #[test]
    fn test_same_job_accumulates_count_and_duration() {
        let mut agg = aggregator();
        assert!(agg.process_row(&make_row(
            "Backup",
            "A1",
            "2024-01-15 10:00:00",
            "2024-01-15 10:30:00"
        )));
        assert!(agg.process_row(&make_row(
            "Backup",
            "A1",
            "15/01/2024 12:00:00",
            "15/01/2024 13:30:00"
        )));

        let state = agg.state();
        let job = state.jobs().get("Backup").unwrap();
        assert_eq!(job.count, 2);
        assert_eq!(job.total_duration_minutes, 120.0);
        assert_eq!(job.average_duration(), 60.0);
        assert_eq!(state.agents().get("A1").unwrap().count, 2);
        assert_eq!(state.processed_rows(), 2);
        assert_eq!(state.total_rows(), 2);
    }

    #[test]
    fn test_names_are_trimmed() {
        let mut agg = aggregator();
        agg.process_row(&make_row(
            "  Backup ",
            "\tA1",
            "2024-01-15 10:00:00",
            "2024-01-15 10:01:00",
        ));
        assert!(agg.state().jobs().get("Backup").is_some());
        assert!(agg.state().agents().get("A1").is_some());
    }

    #[test]
    fn test_numeric_names_accepted() {
        let mut agg = aggregator();
        let row = make_row("x", "y", "2024-01-15 10:00:00", "2024-01-15 10:01:00")
            .with(JOB_NAME, 1001.0)
            .with(AGENT_NAME, 7.0);
        assert!(agg.process_row(&row));
        assert!(agg.state().jobs().get("1001").is_some());
        assert!(agg.state().agents().get("7").is_some());
    }

    #[test]
    fn test_mixed_date_shapes() {
        let mut agg = aggregator();
        let start = Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap();
        let row = RawRow::new()
            .with(JOB_NAME, "Report")
            .with(AGENT_NAME, "A2")
            .with(START_TIME, start)
            .with(END_TIME, 45000.5);
        assert!(agg.process_row(&row));
        assert_eq!(
            agg.state().jobs().get("Report").unwrap().total_duration_minutes,
            720.0
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        let mut agg = aggregator();
        let row = make_row("Backup", "A1", "2024-01-15 10:00:00", "2024-01-15 10:05:00")
            .with("Status", "FAILED")
            .with("Host", 12.0);
        assert!(agg.process_row(&row));
    }

    // ── Duration sign ─────────────────────────────────────────────────────────

    #[test]
    fn test_negative_duration_accepted_by_default() {
        let mut agg = aggregator();
        assert!(agg.process_row(&make_row(
            "Overnight",
            "A1",
            "2024-01-15 23:50:00",
            "2024-01-15 00:10:00"
        )));
        let job = agg.state().jobs().get("Overnight").unwrap();
        assert_eq!(job.total_duration_minutes, -1420.0);
    }

    #[test]
    fn test_zero_duration_accepted() {
        let mut agg = RowAggregator::new(&PipelineConfig {
            reject_negative_durations: true,
            ..Default::default()
        });
        assert!(agg.process_row(&make_row(
            "Instant",
            "A1",
            "2024-01-15 10:00:00",
            "2024-01-15 10:00:00"
        )));
    }

    #[test]
    fn test_negative_duration_rejected_when_configured() {
        let mut agg = RowAggregator::new(&PipelineConfig {
            reject_negative_durations: true,
            ..Default::default()
        });
        assert!(!agg.process_row(&make_row(
            "Overnight",
            "A1",
            "2024-01-15 23:50:00",
            "2024-01-15 00:10:00"
        )));
        let state = agg.state();
        assert_eq!(state.errors()[0].kind, RowRejection::NegativeDuration);
        assert_eq!(state.errors()[0].reason, "negative duration");
        assert!(state.jobs().is_empty());
        assert!(state.agents().is_empty());
    }

    // ── Rejected rows ─────────────────────────────────────────────────────────

    #[test]
    fn test_missing_agent_rejected() {
        let mut agg = aggregator();
        let row = RawRow::new()
            .with(JOB_NAME, "Backup")
            .with(START_TIME, "2024-01-15 10:00:00")
            .with(END_TIME, "2024-01-15 10:30:00");
        assert!(!agg.process_row(&row));

        let state = agg.state();
        assert_eq!(state.error_rows(), 1);
        assert_eq!(state.processed_rows(), 0);
        assert_eq!(state.total_rows(), 1);
        let err = &state.errors()[0];
        assert_eq!(err.row, 1);
        assert_eq!(err.job_name, "Backup");
        assert_eq!(err.reason, "job or agent name missing");
        assert_eq!(err.data, row);
    }

    #[test]
    fn test_whitespace_name_is_missing() {
        let mut agg = aggregator();
        assert!(!agg.process_row(&make_row(
            "   ",
            "A1",
            "2024-01-15 10:00:00",
            "2024-01-15 10:30:00"
        )));
        let err = &agg.state().errors()[0];
        assert_eq!(err.kind, RowRejection::MissingName);
        // Label is the raw cell text, untrimmed.
        assert_eq!(err.job_name, "   ");
    }

    #[test]
    fn test_missing_job_labelled_unknown() {
        let mut agg = aggregator();
        let row = RawRow::new().with(AGENT_NAME, "A1");
        agg.process_row(&row);
        assert_eq!(agg.state().errors()[0].job_name, UNKNOWN_JOB);
    }

    #[test]
    fn test_numeric_names_use_display_form() {
        let mut agg = aggregator();
        let row = RawRow::new()
            .with(JOB_NAME, 42.0)
            .with(AGENT_NAME, 7.0)
            .with(START_TIME, "2024-01-15 10:00:00")
            .with(END_TIME, "2024-01-15 10:30:00");
        assert!(agg.process_row(&row));
        assert_eq!(agg.state().jobs().get("42").unwrap().count, 1);
        assert_eq!(agg.state().agents().get("7").unwrap().count, 1);
    }

    #[test]
    fn test_zero_or_nan_name_is_missing_and_unknown() {
        let mut agg = aggregator();
        for job in [0.0, f64::NAN] {
            let row = RawRow::new()
                .with(JOB_NAME, job)
                .with(AGENT_NAME, "A1")
                .with(START_TIME, "2024-01-15 10:00:00")
                .with(END_TIME, "2024-01-15 10:30:00");
            assert!(!agg.process_row(&row));
        }
        let errors = agg.state().errors();
        assert!(errors
            .iter()
            .all(|e| e.kind == RowRejection::MissingName && e.job_name == UNKNOWN_JOB));
    }

    #[test]
    fn test_names_checked_before_dates() {
        let mut agg = aggregator();
        agg.process_row(&make_row("Backup", "", "garbage", "garbage"));
        assert_eq!(agg.state().errors()[0].kind, RowRejection::MissingName);
    }

    #[test]
    fn test_invalid_dates_rejected() {
        let mut agg = aggregator();
        assert!(!agg.process_row(&make_row("Backup", "A1", "2024-01-15 10:00:00", "soon")));
        assert!(!agg.process_row(&make_row(
            "Backup",
            "A1",
            "1850-01-01 00:00:00",
            "2024-01-15 10:00:00"
        )));
        let state = agg.state();
        assert_eq!(state.error_rows(), 2);
        assert!(state
            .errors()
            .iter()
            .all(|e| e.kind == RowRejection::InvalidDates && e.reason == "invalid dates"));
        assert!(state.jobs().is_empty());
    }

    #[test]
    fn test_error_positions_count_all_rows() {
        let mut agg = aggregator();
        let good = make_row("Backup", "A1", "2024-01-15 10:00:00", "2024-01-15 10:30:00");
        let bad = make_row("Backup", "", "2024-01-15 10:00:00", "2024-01-15 10:30:00");
        for row in [&good, &bad, &good, &bad] {
            agg.process_row(row);
        }
        let positions: Vec<usize> = agg.state().errors().iter().map(|e| e.row).collect();
        assert_eq!(positions, vec![2, 4]);
    }

    // ── Counters ──────────────────────────────────────────────────────────────

    #[test]
    fn test_counters_always_balance() {
        let mut agg = aggregator();
        let rows = vec![
            make_row("a", "x", "2024-01-15 10:00:00", "2024-01-15 10:30:00"),
            make_row("", "x", "2024-01-15 10:00:00", "2024-01-15 10:30:00"),
            make_row("b", "y", "nope", "2024-01-15 10:30:00"),
            RawRow::new(),
            make_row("a", "y", "2024-01-15 11:00:00", "2024-01-15 11:10:00"),
        ];
        for row in &rows {
            agg.process_row(row);
        }
        let stats = agg.into_state().statistics();
        assert_eq!(stats.total_rows, rows.len());
        assert_eq!(stats.processed_rows + stats.error_rows, stats.total_rows);
        assert_eq!(stats.processed_rows, 2);
        assert_eq!(stats.error_rows, 3);
    }

    // ── Tally ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_tally_keeps_first_seen_order() {
        let mut tally: Tally<AgentRecord> = Tally::default();
        for name in ["b", "a", "b", "c", "a"] {
            tally.entry(name).add_occurrence();
        }
        let names: Vec<&str> = tally.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(tally.get("a").unwrap().count, 2);
        assert_eq!(tally.len(), 3);
    }
}

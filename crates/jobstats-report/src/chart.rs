//! Top-N chart series and a plain-text bar rendering of them.

use jobstats_core::formatting::{format_duration, format_number, truncate_label};
use jobstats_core::models::ProjectedResult;
use serde::Serialize;

/// Number of entries a chart shows unless told otherwise.
pub const DEFAULT_TOP_N: usize = 20;

/// Names longer than this are shortened for axis labels.
const LABEL_MAX_CHARS: usize = 25;
const LABEL_KEEP_CHARS: usize = 22;

const BAR_FILLED: char = '\u{2588}'; // █
const BAR_EMPTY: char = '\u{2591}'; // ░

/// How a series' values should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Count,
    /// Minutes.
    Duration,
}

/// One labelled bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub name: String,
    /// `name`, shortened to fit an axis label.
    pub short_name: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            short_name: truncate_label(name, LABEL_MAX_CHARS, LABEL_KEEP_CHARS),
            value,
        }
    }

    fn display_value(&self, kind: ValueKind) -> String {
        match kind {
            ValueKind::Count => format_number(self.value, 0),
            ValueKind::Duration => format_duration(self.value),
        }
    }
}

/// A titled, descending list of at most N points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub kind: ValueKind,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Keep the `n` largest `(name, value)` pairs, largest first.
    ///
    /// Equal values keep their input order.
    pub fn top_n<'a>(
        title: &str,
        kind: ValueKind,
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
        n: usize,
    ) -> Self {
        let mut points: Vec<ChartPoint> = pairs
            .into_iter()
            .map(|(name, value)| ChartPoint::new(name, value))
            .collect();
        points.sort_by(|a, b| b.value.total_cmp(&a.value));
        points.truncate(n);
        Self {
            title: title.to_string(),
            kind,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Horizontal bar chart, one line per point, scaled to the largest value.
    pub fn render_bars(&self, width: usize) -> Vec<String> {
        let label_width = self
            .points
            .iter()
            .map(|p| p.short_name.chars().count())
            .max()
            .unwrap_or(0);
        let peak = self
            .points
            .iter()
            .map(|p| p.value)
            .fold(0.0_f64, f64::max);

        self.points
            .iter()
            .map(|point| {
                let (filled, empty) = build_bar(point.value, peak, width);
                format!(
                    "{:<label_width$}  {}{}  {}",
                    point.short_name,
                    filled,
                    empty,
                    point.display_value(self.kind)
                )
            })
            .collect()
    }
}

// ── Series builders ───────────────────────────────────────────────────────────

/// Most frequent jobs.
pub fn job_frequency(result: &ProjectedResult, n: usize) -> ChartSeries {
    ChartSeries::top_n(
        &format!("Top {n} Jobs by Frequency"),
        ValueKind::Count,
        result.jobs().map(|(name, freq, _)| (name, freq as f64)),
        n,
    )
}

/// Most active agents.
pub fn agent_frequency(result: &ProjectedResult, n: usize) -> ChartSeries {
    ChartSeries::top_n(
        &format!("Top {n} Agents by Frequency"),
        ValueKind::Count,
        result.agents().map(|(name, freq)| (name, freq as f64)),
        n,
    )
}

/// Average duration of the `n` most frequent jobs, in frequency order.
pub fn average_duration(result: &ProjectedResult, n: usize) -> ChartSeries {
    let top = job_frequency(result, n);
    let points = top
        .points
        .into_iter()
        .filter_map(|point| {
            let (_, _, average) = result.jobs().find(|(name, _, _)| *name == point.name)?;
            Some(ChartPoint { value: average, ..point })
        })
        .collect();
    ChartSeries {
        title: format!("Average Duration of Top {n} Jobs"),
        kind: ValueKind::Duration,
        points,
    }
}

/// `(filled, empty)` halves of a bar `width` cells wide. Negative values
/// render as an empty bar.
fn build_bar(value: f64, peak: f64, width: usize) -> (String, String) {
    let ratio = if peak > 0.0 {
        (value / peak).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    (
        std::iter::repeat(BAR_FILLED).take(filled).collect(),
        std::iter::repeat(BAR_EMPTY).take(empty).collect(),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ProjectedResult {
        ProjectedResult {
            job_names: vec![
                "Backup".into(),
                "warehouse-full-refresh-eu-west-1".into(),
                "Sync".into(),
            ],
            job_frequencies: vec![5, 3, 3],
            average_durations: vec![12.5, 95.0, 0.0],
            agent_names: vec!["A1".into(), "A2".into()],
            agent_frequencies: vec![7, 4],
            ..Default::default()
        }
    }

    // ── top_n ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_top_n_sorts_and_truncates() {
        let series = ChartSeries::top_n(
            "t",
            ValueKind::Count,
            [("a", 1.0), ("b", 9.0), ("c", 4.0), ("d", 7.0)],
            3,
        );
        let names: Vec<&str> = series.points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_top_n_ties_keep_input_order() {
        let series = ChartSeries::top_n("t", ValueKind::Count, [("x", 2.0), ("y", 2.0)], 5);
        assert_eq!(series.points[0].name, "x");
        assert_eq!(series.points[1].name, "y");
    }

    #[test]
    fn test_top_n_zero_is_empty() {
        let series = ChartSeries::top_n("t", ValueKind::Count, [("x", 2.0)], 0);
        assert!(series.is_empty());
    }

    #[test]
    fn test_short_name_truncation() {
        let point = ChartPoint::new("warehouse-full-refresh-eu-west-1", 1.0);
        assert_eq!(point.short_name, "warehouse-full-refresh...");
        assert_eq!(point.short_name.chars().count(), 25);

        let exact = "a".repeat(25);
        assert_eq!(ChartPoint::new(&exact, 1.0).short_name, exact);
    }

    #[test]
    fn test_short_name_multibyte() {
        let name = "relatório-diário-de-execução-completo";
        let point = ChartPoint::new(name, 1.0);
        assert_eq!(point.short_name, "relatório-diário-de-ex...");
    }

    // ── Builders ──────────────────────────────────────────────────────────────

    #[test]
    fn test_job_and_agent_frequency_series() {
        let jobs = job_frequency(&result(), DEFAULT_TOP_N);
        assert_eq!(jobs.title, "Top 20 Jobs by Frequency");
        assert_eq!(jobs.points.len(), 3);
        assert_eq!(jobs.points[0].value, 5.0);

        let agents = agent_frequency(&result(), 1);
        assert_eq!(agents.points.len(), 1);
        assert_eq!(agents.points[0].name, "A1");
    }

    #[test]
    fn test_average_duration_follows_frequency_rank() {
        let series = average_duration(&result(), 2);
        assert_eq!(series.kind, ValueKind::Duration);
        let values: Vec<(&str, f64)> = series
            .points
            .iter()
            .map(|p| (p.name.as_str(), p.value))
            .collect();
        assert_eq!(
            values,
            vec![("Backup", 12.5), ("warehouse-full-refresh-eu-west-1", 95.0)]
        );
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_render_bars_scales_to_peak() {
        let series = ChartSeries::top_n("t", ValueKind::Count, [("big", 10.0), ("half", 5.0)], 5);
        let lines = series.render_bars(10);
        assert_eq!(lines[0], format!("big   {}  10", "█".repeat(10)));
        assert_eq!(lines[1], format!("half  {}{}  5", "█".repeat(5), "░".repeat(5)));
    }

    #[test]
    fn test_render_bars_groups_large_counts() {
        let series = ChartSeries::top_n("t", ValueKind::Count, [("busy", 12_345.0)], 5);
        assert!(series.render_bars(2)[0].ends_with("  12,345"));
    }

    #[test]
    fn test_render_bars_durations() {
        let lines = average_duration(&result(), 3).render_bars(4);
        assert!(lines[1].ends_with("1h 35min"));
        assert!(lines[2].ends_with("N/A"));
    }

    #[test]
    fn test_build_bar_handles_zero_peak_and_negatives() {
        assert_eq!(build_bar(0.0, 0.0, 3), (String::new(), "░░░".to_string()));
        assert_eq!(build_bar(-5.0, 10.0, 2), (String::new(), "░░".to_string()));
    }
}

//! Plain-text summary panel printed after a run.

use std::fmt;

use jobstats_core::formatting::{format_count, format_duration};
use jobstats_core::models::{ProjectedResult, AGENT_NAME, JOB_NAME};

use crate::chart;
use crate::sheets::{column_widths, errors_sheet, statistics_sheet, Sheet};

/// Errors listed individually before the rest are summarised as a count.
pub const MAX_LISTED_ERRORS: usize = 50;

const BAR_WIDTH: usize = 30;

/// Render statistics, the top `top_n` jobs and agents, the average duration
/// of those jobs, and the error list.
pub fn render_summary(result: &ProjectedResult, top_n: usize) -> String {
    let mut out = String::new();

    push_heading(&mut out, "Run Statistics");
    push_table(&mut out, &statistics_sheet(result));

    push_heading(&mut out, &format!("Top {top_n} Jobs"));
    let jobs = chart::job_frequency(result, top_n);
    if jobs.is_empty() {
        out.push_str("No jobs processed.\n");
    } else {
        push_table(&mut out, &top_jobs_sheet(result, top_n));
        out.push('\n');
        push_lines(&mut out, jobs.render_bars(BAR_WIDTH));
    }

    push_heading(&mut out, &format!("Top {top_n} Agents"));
    let agents = chart::agent_frequency(result, top_n);
    if agents.is_empty() {
        out.push_str("No agents processed.\n");
    } else {
        push_table(&mut out, &top_agents_sheet(result, top_n));
        out.push('\n');
        push_lines(&mut out, agents.render_bars(BAR_WIDTH));
    }

    let durations = chart::average_duration(result, top_n);
    if !durations.is_empty() {
        push_heading(&mut out, &durations.title);
        push_lines(&mut out, durations.render_bars(BAR_WIDTH));
    }

    if !result.errors.is_empty() {
        push_heading(&mut out, &format!("Errors ({})", format_count(result.errors.len() as u64)));
        let mut listed = errors_sheet(result);
        listed.rows.truncate(MAX_LISTED_ERRORS);
        push_table(&mut out, &listed);

        let hidden = result.errors.len().saturating_sub(MAX_LISTED_ERRORS);
        if hidden > 0 {
            out.push_str(&format!("... and {} more\n", format_count(hidden as u64)));
        }
    }

    out
}

/// Render `sheet` as left-aligned columns under a dashed rule.
pub fn render_table(sheet: &Sheet) -> Vec<String> {
    let widths = column_widths(sheet);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w - 2)).collect();

    let mut lines = Vec::with_capacity(sheet.rows.len() + 2);
    lines.push(render_row(&sheet.header, &widths));
    lines.push(render_row(&rule, &widths));
    lines.extend(sheet.rows.iter().map(|row| render_row(row, &widths)));
    lines
}

fn render_row<T: fmt::Display>(row: &[T], widths: &[usize]) -> String {
    let line: String = row
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    line.trim_end().to_string()
}

fn top_jobs_sheet(result: &ProjectedResult, top_n: usize) -> Sheet {
    let mut sheet = Sheet::new("Top Jobs", &[JOB_NAME, "Frequency", "Average Duration"]);
    for (name, frequency, average) in result.jobs().take(top_n) {
        sheet.push_row(vec![
            name.into(),
            format_count(frequency).into(),
            format_duration(average).into(),
        ]);
    }
    sheet
}

fn top_agents_sheet(result: &ProjectedResult, top_n: usize) -> Sheet {
    let mut sheet = Sheet::new("Top Agents", &[AGENT_NAME, "Frequency"]);
    for (name, frequency) in result.agents().take(top_n) {
        sheet.push_row(vec![name.into(), format_count(frequency).into()]);
    }
    sheet
}

fn push_heading(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count()));
    out.push('\n');
}

fn push_table(out: &mut String, sheet: &Sheet) {
    push_lines(out, render_table(sheet));
}

fn push_lines(out: &mut String, lines: Vec<String>) {
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

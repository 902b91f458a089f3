//! End-of-pass projection of the aggregation state into ranked sequences.

use jobstats_core::models::ProjectedResult;

use crate::aggregator::{AggregationState, Tally};

/// Stateless helper that ranks the accumulated tallies.
pub struct ResultsProjector;

impl ResultsProjector {
    /// Build the ranked, index-aligned summary for `state`.
    ///
    /// Jobs and agents are each ordered by descending count; equal counts
    /// keep the order in which the names were first seen.
    pub fn project(state: &AggregationState) -> ProjectedResult {
        let jobs = ranked(state.jobs(), |job| job.count);
        let agents = ranked(state.agents(), |agent| agent.count);

        ProjectedResult {
            job_names: jobs.iter().map(|(name, _)| name.to_string()).collect(),
            job_frequencies: jobs.iter().map(|(_, job)| job.count).collect(),
            average_durations: jobs.iter().map(|(_, job)| job.average_duration()).collect(),
            agent_names: agents.iter().map(|(name, _)| name.to_string()).collect(),
            agent_frequencies: agents.iter().map(|(_, agent)| agent.count).collect(),
            statistics: state.statistics(),
            errors: state.errors().to_vec(),
        }
    }
}

/// Entries of `tally` sorted by descending `count`. `sort_by` is stable, so
/// ties stay in first-seen order.
fn ranked<'a, R>(tally: &'a Tally<R>, count: impl Fn(&R) -> u64) -> Vec<(&'a str, &'a R)> {
    let mut entries: Vec<_> = tally.iter().collect();
    entries.sort_by(|a, b| count(b.1).cmp(&count(a.1)));
    entries
}

// ── Tests ─────────────────────────────────────────────────────────────────────

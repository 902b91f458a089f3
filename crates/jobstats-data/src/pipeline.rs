//! Ingestion pipeline: decoded rows in, ranked [`ProjectedResult`] out.

use std::path::Path;

use jobstats_core::dates::DateNormalizer;
use jobstats_core::error::Result;
use jobstats_core::models::{ProjectedResult, RawRow};
use jobstats_core::settings::PipelineConfig;
use tracing::info;

use crate::aggregator::RowAggregator;
use crate::projector::ResultsProjector;
use crate::reader::{read_rows, FileKind};

/// Runs the aggregation pass over a sequence of rows.
///
/// The pipeline holds configuration only; every [`run`](Self::run) starts
/// from a fresh state, so repeated runs over the same rows give equal
/// results.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    config: PipelineConfig,
    normalizer: DateNormalizer,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl IngestionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = DateNormalizer::new(&config.timezone);
        Self { config, normalizer }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fold every row, in order, and project the result.
    pub fn run(&self, rows: &[RawRow]) -> ProjectedResult {
        let started = std::time::Instant::now();

        let mut aggregator =
            RowAggregator::with_normalizer(self.normalizer, self.config.reject_negative_durations);
        for row in rows {
            aggregator.process_row(row);
        }
        let result = ResultsProjector::project(aggregator.state());

        let stats = &result.statistics;
        info!(
            "Processed {} rows: {} accepted, {} rejected ({}% success), {} jobs, {} agents in {:.3}s",
            stats.total_rows,
            stats.processed_rows,
            stats.error_rows,
            stats.success_rate_label(),
            result.job_names.len(),
            result.agent_names.len(),
            started.elapsed().as_secs_f64()
        );

        result
    }

    /// Decode `path` as `kind` and run the pipeline over its rows.
    ///
    /// Decode failures abort before any row is processed.
    pub async fn ingest_file(&self, path: &Path, kind: FileKind) -> Result<ProjectedResult> {
        let rows = read_rows(path, kind).await?;
        info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(self.run(&rows))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

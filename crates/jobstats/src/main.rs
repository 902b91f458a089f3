mod bootstrap;

use anyhow::{Context, Result};
use jobstats_core::models::ProjectedResult;
use jobstats_core::settings::Settings;
use jobstats_data::pipeline::IngestionPipeline;
use jobstats_data::reader::FileKind;
use jobstats_report::sheets::{workbook, write_json, write_workbook};
use jobstats_report::summary::render_summary;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("jobstats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, Kind: {}, Timezone: {}",
        settings.input.display(),
        settings.kind,
        settings.timezone
    );

    let result = run(&settings).await?;
    print!("{}", render_summary(&result, settings.top_n()));

    Ok(())
}

/// Ingest the configured input and write any requested exports.
async fn run(settings: &Settings) -> Result<ProjectedResult> {
    let kind = FileKind::resolve(&settings.kind, &settings.input)?;
    let pipeline = IngestionPipeline::new(settings.pipeline_config());

    let result = pipeline
        .ingest_file(&settings.input, kind)
        .await
        .with_context(|| format!("failed to ingest {}", settings.input.display()))?;

    if let Some(path) = &settings.xlsx_out {
        write_workbook(path, &workbook(&result))
            .with_context(|| format!("failed to export sheets to {}", path.display()))?;
    }
    if let Some(path) = &settings.json_out {
        write_json(path, &result)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(result)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

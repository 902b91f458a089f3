use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Aggregate job-execution logs into ranked job and agent statistics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "jobstats",
    about = "Aggregate job-execution logs into ranked job and agent statistics",
    version
)]
pub struct Settings {
    /// Job log to ingest (.csv, .tsv, .txt, .xlsx, .xls, .ods, .json, .jsonl, .ndjson)
    pub input: PathBuf,

    /// Input format (detected from the file extension when "auto")
    #[arg(long, default_value = "auto", value_parser = ["auto", "csv", "tsv", "xlsx", "json", "jsonl"])]
    pub kind: String,

    /// Timezone for wall-clock dates and spreadsheet serials ("auto" = system)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Reject rows whose end time is before their start time
    #[arg(long)]
    pub reject_negative_durations: bool,

    /// Number of jobs / agents shown in ranked views (1-100)
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_n: u32,

    /// Path to write the report sheets to as an .xlsx workbook
    #[arg(long)]
    pub xlsx_out: Option<PathBuf>,

    /// Path to write the full result as JSON
    #[arg(long)]
    pub json_out: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Knobs for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// IANA timezone used to interpret wall-clock dates and serial numbers.
    pub timezone: String,
    /// When `true`, rows with `end < start` are rejected instead of being
    /// aggregated with a negative duration.
    pub reject_negative_durations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            reject_negative_durations: false,
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve_auto_values(Settings::parse_from(args))
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = get_system_timezone();
        }

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            timezone: self.timezone.clone(),
            reject_negative_durations: self.reject_negative_durations,
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n as usize
    }
}

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while decoding, processing and exporting job logs.
///
/// Row-level validation failures are not represented here; they are recorded
/// as [`crate::models::ProcessingError`] entries and never abort a run.
#[derive(Error, Debug)]
pub enum JobStatsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An export file or directory could not be created or written.
    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file kind is not one the decoders understand.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The input was readable but its contents could not be turned into rows.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A delimited-text document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the jobstats crates.
pub type Result<T> = std::result::Result<T, JobStatsError>;

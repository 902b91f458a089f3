//! Presentation layer for job-log summaries.
//!
//! Lays a [`ProjectedResult`](jobstats_core::models::ProjectedResult) out as
//! named sheets (exported as an `.xlsx` workbook or JSON), top-N chart
//! series, and the plain-text summary panel printed by the command-line tool.

pub mod chart;
pub mod sheets;
pub mod summary;

pub use jobstats_core as core;

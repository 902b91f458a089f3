//! Data ingestion layer for job-execution logs.
//!
//! Decodes log files into raw rows, validates and tallies them per job and
//! per agent, and projects the tallies into a ranked summary.

pub mod aggregator;
pub mod pipeline;
pub mod projector;
pub mod reader;

pub use jobstats_core as core;

//! Core types for jobstats.
//!
//! Row and cell models, the date normalizer, error types, configuration and
//! display formatting shared by the data, report and binary crates.

pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{JobStatsError, Result};

//! Cohort aggregation.

pub mod summary;

pub use summary::{summarize, summarize_all, summarize_set, CohortSummary, PresenceFraction};

//! Pipeline composition and execution for the cohort analyses.

mod runner;

pub use runner::{run_study, AnalysisConfig, Pipeline, PipelineConfig};

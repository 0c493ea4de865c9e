//! Bilirubin reductase (BilR) presence/absence cohort analysis.
//!
//! This library classifies metagenomic samples by the abundance of the
//! bilirubin reductase gene and compares presence fractions between cohorts
//! of infants, IBD patients, and healthy adults.
//!
//! # Overview
//!
//! The library is organized into forward-only stages:
//!
//! - **data**: Sample records, exclusion diagnostics, and result tables
//! - **normalize**: Counts-per-million with a sequencing depth filter
//! - **classify**: Threshold-based presence/absence calls
//! - **cohort**: Disease groups, infant age bins, and composite cohorts
//! - **aggregate**: Per-cohort counts, presence fraction, mean CPM
//! - **test**: Chi-squared tests of equal proportions
//! - **correct**: Optional multiple testing correction
//! - **pipeline**: Configuration and execution of the full study
//!
//! # Example
//!
//! ```no_run
//! use bilr_cohorts::prelude::*;
//!
//! let table = SampleTable::from_tsv("samples.tsv").unwrap();
//!
//! let output = Pipeline::new()
//!     .name("ibd")
//!     .min_total_reads(1_000_000)
//!     .presence_threshold(5.0)
//!     .analysis(
//!         AnalysisConfig::new("ibd", CohortScheme::disease_groups(&["CD", "UC", "healthy"]))
//!             .all_groups()
//!             .pair("CD", "UC"),
//!     )
//!     .run(&table)
//!     .unwrap();
//! ```

pub mod aggregate;
pub mod classify;
pub mod cohort;
pub mod correct;
pub mod data;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{
        summarize, summarize_all, summarize_set, CohortSummary, PresenceFraction,
    };
    pub use crate::classify::{ClassifiedRecord, Classifier, Presence, DEFAULT_CPM_THRESHOLD};
    pub use crate::cohort::{
        concat_cohorts, AgeBinning, Cohort, CohortBuilder, CohortScheme, CohortSet,
        CompositeMember, HEALTHY, INFANT,
    };
    pub use crate::correct::{bh_adjust, Correction};
    pub use crate::data::{
        AnalysisOutput, Diagnostics, Exclusion, FilterReason, HostAge, MalformedReason,
        PipelineOutput, SampleRecord, SampleTable,
    };
    pub use crate::error::{BilrError, Result};
    pub use crate::normalize::{norm_cpm, norm_cpm_default, CpmConfig, CpmTable, NormalizedRecord};
    pub use crate::pipeline::{run_study, AnalysisConfig, Pipeline, PipelineConfig};
    pub use crate::test::{
        ContingencyTable, ContinuityCorrection, PairwiseResults, PearsonChiSquared,
        ProportionTest, ProportionTestResult, ProportionTester, TestOutcome,
    };
}

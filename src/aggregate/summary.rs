//! Per-cohort summary statistics.

use crate::cohort::{Cohort, CohortSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fraction of samples called present.
///
/// An empty cohort has no fraction; it is reported as `Undefined` instead of
/// a silent `0/0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceFraction {
    Defined(f64),
    Undefined,
}

impl PresenceFraction {
    /// Compute `present / n`.
    pub fn from_counts(present: usize, n: usize) -> Self {
        if n == 0 {
            Self::Undefined
        } else {
            Self::Defined(present as f64 / n as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl std::fmt::Display for PresenceFraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{:.4}", v),
            Self::Undefined => f.write_str("NA"),
        }
    }
}

/// Summary of a single cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    /// Cohort label.
    pub label: String,
    /// Number of samples.
    pub n: usize,
    /// Samples called present.
    pub present_count: usize,
    /// Samples called absent.
    pub absent_count: usize,
    /// `present_count / n`.
    pub presence_fraction: PresenceFraction,
    /// Mean CPM; `None` for an empty cohort.
    pub mean_cpm: Option<f64>,
}

impl CohortSummary {
    /// Percentage of samples present, if defined.
    pub fn presence_percent(&self) -> Option<f64> {
        self.presence_fraction.value().map(|f| f * 100.0)
    }
}

/// Summarize one cohort.
pub fn summarize(cohort: &Cohort) -> CohortSummary {
    let n = cohort.n();
    let present_count = cohort.present_count();
    let mean_cpm = if n == 0 {
        None
    } else {
        Some(cohort.records.iter().map(|r| r.cpm).sum::<f64>() / n as f64)
    };

    CohortSummary {
        label: cohort.label.clone(),
        n,
        present_count,
        absent_count: n - present_count,
        presence_fraction: PresenceFraction::from_counts(present_count, n),
        mean_cpm,
    }
}

/// Summarize cohorts in parallel, returning them in input order.
pub fn summarize_all(cohorts: &[Cohort]) -> Vec<CohortSummary> {
    cohorts.par_iter().map(summarize).collect()
}

/// Summarize every cohort of a set, in display order.
pub fn summarize_set(set: &CohortSet) -> Vec<CohortSummary> {
    summarize_all(&set.cohorts)
}

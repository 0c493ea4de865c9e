//! Row-level exclusion tracking.
//!
//! Samples leave the pipeline for two different reasons: their data is
//! unusable (malformed), or a stage deliberately scoped them out (filtered).
//! Both are recorded so the counts can be reported separately.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a row could not be used at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedReason {
    /// No sample identifier.
    MissingSampleId,
    /// The sample identifier was already seen.
    DuplicateSampleId,
    /// A count column was empty.
    MissingCount { column: String },
    /// A count column was not a non-negative integer.
    NonNumericCount { column: String, value: String },
    /// A count column was negative.
    NegativeCount { column: String, value: String },
    /// `total_reads` was zero, so CPM is undefined.
    ZeroDepth,
    /// The row could not be decoded, e.g. invalid UTF-8.
    UndecodableRow { message: String },
}

impl MalformedReason {
    /// Short stable name used in tallies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingSampleId => "missing_sample_id",
            Self::DuplicateSampleId => "duplicate_sample_id",
            Self::MissingCount { .. } => "missing_count",
            Self::NonNumericCount { .. } => "non_numeric_count",
            Self::NegativeCount { .. } => "negative_count",
            Self::ZeroDepth => "zero_depth",
            Self::UndecodableRow { .. } => "undecodable_row",
        }
    }
}

/// Why a valid row was scoped out of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterReason {
    /// Sequencing depth at or below the minimum.
    Depth,
    /// Bioproject is on the exclusion list.
    ExcludedBioproject,
    /// Host disease is not part of the cohort scheme.
    Disease,
    /// Age required but missing or non-numeric.
    AgeMissing,
    /// Age outside the scheme's range.
    AgeOutOfRange,
}

impl FilterReason {
    /// Short stable name used in tallies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::ExcludedBioproject => "excluded_bioproject",
            Self::Disease => "disease",
            Self::AgeMissing => "age_missing",
            Self::AgeOutOfRange => "age_out_of_range",
        }
    }
}

/// A sample removed from the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Exclusion {
    Malformed {
        sample_id: String,
        reason: MalformedReason,
    },
    FilteredOut {
        sample_id: String,
        reason: FilterReason,
    },
}

impl Exclusion {
    pub fn malformed(sample_id: &str, reason: MalformedReason) -> Self {
        Self::Malformed {
            sample_id: sample_id.to_string(),
            reason,
        }
    }

    pub fn filtered(sample_id: &str, reason: FilterReason) -> Self {
        Self::FilteredOut {
            sample_id: sample_id.to_string(),
            reason,
        }
    }

    pub fn sample_id(&self) -> &str {
        match self {
            Self::Malformed { sample_id, .. } | Self::FilteredOut { sample_id, .. } => sample_id,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::FilteredOut { .. })
    }

    /// Reason name, prefixed by its category.
    pub fn key(&self) -> String {
        match self {
            Self::Malformed { reason, .. } => format!("malformed:{}", reason.name()),
            Self::FilteredOut { reason, .. } => format!("filtered:{}", reason.name()),
        }
    }
}

/// Aggregate exclusion counts for one stage or scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Rows whose data was unusable.
    pub n_malformed: usize,
    /// Rows deliberately scoped out.
    pub n_filtered: usize,
    /// Counts keyed by `category:reason`.
    pub by_reason: BTreeMap<String, usize>,
}

impl Diagnostics {
    /// Tally a set of exclusions.
    pub fn from_exclusions<'a, I: IntoIterator<Item = &'a Exclusion>>(exclusions: I) -> Self {
        let mut diag = Self::default();
        for exclusion in exclusions {
            diag.record(exclusion);
        }
        diag
    }

    fn record(&mut self, exclusion: &Exclusion) {
        if exclusion.is_malformed() {
            self.n_malformed += 1;
        } else {
            self.n_filtered += 1;
        }
        *self.by_reason.entry(exclusion.key()).or_insert(0) += 1;
    }

    /// Count for a filter reason.
    pub fn filtered(&self, reason: FilterReason) -> usize {
        self.by_reason
            .get(&format!("filtered:{}", reason.name()))
            .copied()
            .unwrap_or(0)
    }

    /// Combine two tallies.
    pub fn merge(mut self, other: &Diagnostics) -> Self {
        self.n_malformed += other.n_malformed;
        self.n_filtered += other.n_filtered;
        for (key, count) in &other.by_reason {
            *self.by_reason.entry(key.clone()).or_insert(0) += count;
        }
        self
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Excluded samples")?;
        writeln!(f, "  Malformed:    {}", self.n_malformed)?;
        writeln!(f, "  Filtered out: {}", self.n_filtered)?;
        for (key, count) in &self.by_reason {
            writeln!(f, "    {:<32} {}", key, count)?;
        }
        Ok(())
    }
}

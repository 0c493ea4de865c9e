//! Cohort scheme definitions.

use crate::cohort::age::AgeBinning;
use crate::data::{FilterReason, SampleRecord};
use crate::error::{BilrError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Host disease label for infant samples.
pub const INFANT: &str = "infant";

/// Host disease label for healthy adult samples.
pub const HEALTHY: &str = "healthy";

/// One member of a composite scheme.
///
/// Members select by host disease and, optionally, an age window
/// `[min_age, age_below)` in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMember {
    /// Cohort label.
    pub label: String,
    /// Host disease the member draws from.
    pub host_disease: String,
    /// Minimum age in days, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<f64>,
    /// Age in days the member must stay below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_below: Option<f64>,
}

impl CompositeMember {
    pub fn new(label: &str, host_disease: &str) -> Self {
        Self {
            label: label.to_string(),
            host_disease: host_disease.to_string(),
            min_age: None,
            age_below: None,
        }
    }

    /// Restrict the member to ages in `[min_age, age_below)`.
    pub fn age_range(mut self, min_age: f64, age_below: f64) -> Self {
        self.min_age = Some(min_age);
        self.age_below = Some(age_below);
        self
    }

    fn has_age_filter(&self) -> bool {
        self.min_age.is_some() || self.age_below.is_some()
    }

    fn admits_age(&self, age: f64) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.age_below.map_or(true, |max| age < max)
    }
}

/// How samples are partitioned into cohorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CohortScheme {
    /// One cohort per listed host disease, in list order.
    DiseaseGroups { groups: Vec<String> },
    /// Age bins over samples of a single host disease.
    AgeBins {
        #[serde(default = "default_age_disease")]
        host_disease: String,
        binning: AgeBinning,
    },
    /// Independently filtered members with distinct host diseases.
    Composite { members: Vec<CompositeMember> },
}

fn default_age_disease() -> String {
    INFANT.to_string()
}

impl CohortScheme {
    /// Disease groups in the given display order.
    pub fn disease_groups(groups: &[&str]) -> Self {
        Self::DiseaseGroups {
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    /// Infant age bins.
    pub fn infant_age_bins(binning: AgeBinning) -> Self {
        Self::AgeBins {
            host_disease: INFANT.to_string(),
            binning,
        }
    }

    pub fn composite(members: Vec<CompositeMember>) -> Self {
        Self::Composite { members }
    }

    /// Cohort labels in display order.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::DiseaseGroups { groups } => groups.clone(),
            Self::AgeBins { binning, .. } => binning.labels(),
            Self::Composite { members } => members.iter().map(|m| m.label.clone()).collect(),
        }
    }

    /// Short name of the scheme kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DiseaseGroups { .. } => "disease_groups",
            Self::AgeBins { .. } => "age_bins",
            Self::Composite { .. } => "composite",
        }
    }

    /// Check that the scheme defines a proper partition.
    pub fn validate(&self) -> Result<()> {
        // Bin labels are generated, so the binning must be bounded first.
        if let Self::AgeBins { binning, .. } = self {
            binning.validate()?;
        }

        let labels = self.labels();
        if labels.is_empty() {
            return Err(BilrError::InvalidParameter(
                "Cohort scheme must define at least one cohort".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(BilrError::InvalidParameter(format!(
                    "Duplicate cohort label '{}'",
                    label
                )));
            }
        }

        match self {
            Self::DiseaseGroups { .. } | Self::AgeBins { .. } => Ok(()),
            Self::Composite { members } => {
                let mut diseases = HashSet::new();
                for member in members {
                    if !diseases.insert(member.host_disease.as_str()) {
                        return Err(BilrError::InvalidParameter(format!(
                            "Composite members must draw from distinct host diseases; \
                             '{}' is used twice",
                            member.host_disease
                        )));
                    }
                    if let (Some(min), Some(max)) = (member.min_age, member.age_below) {
                        if max <= min {
                            return Err(BilrError::InvalidParameter(format!(
                                "Empty age window [{}, {}) for member '{}'",
                                min, max, member.label
                            )));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Index of the cohort a sample belongs to.
    ///
    /// Samples that do not fit the scheme are reported with the reason they
    /// were scoped out.
    pub fn assign(&self, sample: &SampleRecord) -> std::result::Result<usize, FilterReason> {
        match self {
            Self::DiseaseGroups { groups } => groups
                .iter()
                .position(|g| *g == sample.host_disease)
                .ok_or(FilterReason::Disease),

            Self::AgeBins {
                host_disease,
                binning,
            } => {
                if sample.host_disease != *host_disease {
                    return Err(FilterReason::Disease);
                }
                let age = sample.host_age.days().ok_or(FilterReason::AgeMissing)?;
                binning.bin_index(age).ok_or(FilterReason::AgeOutOfRange)
            }

            Self::Composite { members } => {
                let (idx, member) = members
                    .iter()
                    .enumerate()
                    .find(|(_, m)| m.host_disease == sample.host_disease)
                    .ok_or(FilterReason::Disease)?;
                if member.has_age_filter() {
                    let age = sample.host_age.days().ok_or(FilterReason::AgeMissing)?;
                    if !member.admits_age(age) {
                        return Err(FilterReason::AgeOutOfRange);
                    }
                }
                Ok(idx)
            }
        }
    }
}

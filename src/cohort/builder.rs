//! Partitioning classified samples into ordered cohorts.

use crate::classify::ClassifiedRecord;
use crate::cohort::scheme::CohortScheme;
use crate::data::{Diagnostics, Exclusion, FilterReason};
use crate::error::{BilrError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named group of classified samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    /// Cohort label.
    pub label: String,
    /// Member samples, in input order.
    pub records: Vec<ClassifiedRecord>,
}

impl Cohort {
    pub fn new(label: &str, records: Vec<ClassifiedRecord>) -> Self {
        Self {
            label: label.to_string(),
            records,
        }
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Samples called present.
    pub fn present_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_present()).count()
    }

    /// Samples called absent.
    pub fn absent_count(&self) -> usize {
        self.n() - self.present_count()
    }

    /// Relabel the cohort.
    pub fn relabel(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// Cohorts produced by one scheme, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortSet {
    /// The scheme that produced the cohorts.
    pub scheme: CohortScheme,
    /// One cohort per scheme label, including empty ones.
    pub cohorts: Vec<Cohort>,
    /// Samples scoped out by the scheme.
    pub exclusions: Vec<Exclusion>,
}

impl CohortSet {
    /// Number of cohorts.
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Cohort labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.cohorts.iter().map(|c| c.label.as_str()).collect()
    }

    /// Look up a cohort by label.
    pub fn get(&self, label: &str) -> Option<&Cohort> {
        self.cohorts.iter().find(|c| c.label == label)
    }

    /// Total samples assigned across cohorts.
    pub fn n_assigned(&self) -> usize {
        self.cohorts.iter().map(Cohort::n).sum()
    }

    /// Tally of samples the scheme scoped out.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::from_exclusions(&self.exclusions)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cohort> {
        self.cohorts.iter()
    }
}

/// Builds cohorts under a single scheme.
#[derive(Debug, Clone)]
pub struct CohortBuilder {
    scheme: CohortScheme,
    excluded_bioprojects: BTreeSet<String>,
}

impl CohortBuilder {
    /// Create a builder, validating the scheme.
    pub fn new(scheme: CohortScheme) -> Result<Self> {
        scheme.validate()?;
        Ok(Self {
            scheme,
            excluded_bioprojects: BTreeSet::new(),
        })
    }

    /// Drop samples from these bioprojects before assignment.
    pub fn exclude_bioprojects<I, S>(mut self, bioprojects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_bioprojects
            .extend(bioprojects.into_iter().map(Into::into));
        self
    }

    pub fn scheme(&self) -> &CohortScheme {
        &self.scheme
    }

    /// Partition records into cohorts.
    ///
    /// Each record lands in at most one cohort; the rest are recorded as
    /// filtered out with their reason.
    pub fn build(&self, records: &[ClassifiedRecord]) -> CohortSet {
        let labels = self.scheme.labels();
        let mut buckets: Vec<Vec<ClassifiedRecord>> = vec![Vec::new(); labels.len()];
        let mut exclusions = Vec::new();

        for record in records {
            if self.excluded_bioprojects.contains(&record.sample.bioproject) {
                exclusions.push(Exclusion::filtered(
                    record.sample_id(),
                    FilterReason::ExcludedBioproject,
                ));
                continue;
            }
            match self.scheme.assign(&record.sample) {
                Ok(idx) => buckets[idx].push(record.clone()),
                Err(reason) => exclusions.push(Exclusion::filtered(record.sample_id(), reason)),
            }
        }

        let cohorts: Vec<Cohort> = labels
            .iter()
            .zip(buckets)
            .map(|(label, records)| Cohort::new(label, records))
            .collect();

        tracing::debug!(
            scheme = self.scheme.kind(),
            cohorts = cohorts.len(),
            assigned = cohorts.iter().map(Cohort::n).sum::<usize>(),
            excluded = exclusions.len(),
            "built cohorts"
        );

        CohortSet {
            scheme: self.scheme.clone(),
            cohorts,
            exclusions,
        }
    }
}

/// Concatenate independently filtered cohorts under new labels.
///
/// Sources must be disjoint; a sample appearing in two sources is an error.
pub fn concat_cohorts(sources: Vec<(Cohort, &str)>) -> Result<Vec<Cohort>> {
    let mut seen = BTreeSet::new();
    let mut cohorts = Vec::with_capacity(sources.len());

    for (cohort, label) in sources {
        for record in &cohort.records {
            if !seen.insert(record.sample_id().to_string()) {
                return Err(BilrError::InvalidParameter(format!(
                    "Sample '{}' appears in more than one composite source",
                    record.sample_id()
                )));
            }
        }
        cohorts.push(cohort.relabel(label));
    }

    Ok(cohorts)
}

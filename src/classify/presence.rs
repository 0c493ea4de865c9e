//! Threshold-based presence/absence calling.

use crate::data::SampleRecord;
use crate::error::{BilrError, Result};
use crate::normalize::{CpmTable, NormalizedRecord};
use serde::{Deserialize, Serialize};

/// Default CPM threshold; values at or below it are called absent.
pub const DEFAULT_CPM_THRESHOLD: f64 = 5.0;

/// Presence call for the gene of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized sample with its presence call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    /// The source record.
    pub sample: SampleRecord,
    /// Gene abundance in counts per million.
    pub cpm: f64,
    /// Presence call.
    pub presence: Presence,
}

impl ClassifiedRecord {
    pub fn sample_id(&self) -> &str {
        &self.sample.sample_id
    }

    pub fn is_present(&self) -> bool {
        self.presence.is_present()
    }
}

/// Calls presence from CPM with a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CPM_THRESHOLD,
        }
    }
}

impl Classifier {
    /// Create a classifier with a custom threshold.
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(BilrError::InvalidParameter(format!(
                "CPM threshold must be finite and non-negative, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Absent at or below the threshold, present above it.
    pub fn classify(&self, cpm: f64) -> Presence {
        if cpm > self.threshold {
            Presence::Present
        } else {
            Presence::Absent
        }
    }

    /// Attach a presence call to one record.
    pub fn classify_record(&self, record: &NormalizedRecord) -> ClassifiedRecord {
        ClassifiedRecord {
            sample: record.sample.clone(),
            cpm: record.cpm,
            presence: self.classify(record.cpm),
        }
    }

    /// Classify every record of a CPM table, preserving order.
    pub fn classify_all(&self, table: &CpmTable) -> Vec<ClassifiedRecord> {
        let classified: Vec<ClassifiedRecord> = table
            .records
            .iter()
            .map(|r| self.classify_record(r))
            .collect();

        tracing::debug!(
            threshold = self.threshold,
            n = classified.len(),
            present = classified.iter().filter(|r| r.is_present()).count(),
            "classified samples"
        );

        classified
    }
}

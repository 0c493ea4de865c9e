//! Counts-per-million normalization with a sequencing depth filter.
//!
//! Each sample's gene read count is scaled by its total read count:
//!
//! `cpm = gene_reads / total_reads * scale_factor`
//!
//! Shallow samples give unstable CPM estimates, so samples at or below the
//! minimum depth are removed before normalization completes.

use crate::data::{Diagnostics, Exclusion, FilterReason, MalformedReason, SampleRecord};
use crate::error::{BilrError, Result};
use serde::{Deserialize, Serialize};

/// Default minimum depth; samples need strictly more total reads.
pub const DEFAULT_MIN_TOTAL_READS: u64 = 1_000_000;

/// Default scale factor (counts per million).
pub const CPM_SCALE: f64 = 1e6;

/// Configuration for CPM normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpmConfig {
    /// Samples with `total_reads <= min_total_reads` are dropped.
    pub min_total_reads: u64,
    /// Multiplier applied to the read fraction.
    pub scale_factor: f64,
}

impl Default for CpmConfig {
    fn default() -> Self {
        Self {
            min_total_reads: DEFAULT_MIN_TOTAL_READS,
            scale_factor: CPM_SCALE,
        }
    }
}

impl CpmConfig {
    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(BilrError::InvalidParameter(
                "Scale factor must be positive and finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// A sample with its normalized gene abundance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// The source record.
    pub sample: SampleRecord,
    /// Gene abundance in counts per million.
    pub cpm: f64,
}

/// Output of CPM normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpmTable {
    /// Retained records, in input order.
    pub records: Vec<NormalizedRecord>,
    /// Samples removed by this stage.
    pub exclusions: Vec<Exclusion>,
    /// Configuration used.
    pub config: CpmConfig,
}

impl CpmTable {
    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records were retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// CPM values in record order.
    pub fn cpm_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.cpm).collect()
    }

    /// Tally of removed samples.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::from_exclusions(&self.exclusions)
    }
}

/// Compute CPM for a single sample.
///
/// Returns `None` when `total_reads` is zero.
pub fn cpm(gene_reads: u64, total_reads: u64, scale_factor: f64) -> Option<f64> {
    if total_reads == 0 {
        return None;
    }
    Some(gene_reads as f64 / total_reads as f64 * scale_factor)
}

/// Normalize records to CPM and drop shallow samples.
///
/// # Arguments
/// * `records` - Validated sample records
/// * `config` - Depth threshold and scale factor
///
/// # Returns
/// A CpmTable where every record satisfies `total_reads > min_total_reads`.
pub fn norm_cpm(records: &[SampleRecord], config: &CpmConfig) -> Result<CpmTable> {
    config.validate()?;

    let mut kept = Vec::with_capacity(records.len());
    let mut exclusions = Vec::new();

    for record in records {
        if record.total_reads <= config.min_total_reads {
            let exclusion = if record.total_reads == 0 {
                Exclusion::malformed(&record.sample_id, MalformedReason::ZeroDepth)
            } else {
                Exclusion::filtered(&record.sample_id, FilterReason::Depth)
            };
            exclusions.push(exclusion);
            continue;
        }

        match cpm(record.gene_reads, record.total_reads, config.scale_factor) {
            Some(value) if value.is_finite() => kept.push(NormalizedRecord {
                sample: record.clone(),
                cpm: value,
            }),
            _ => exclusions.push(Exclusion::malformed(
                &record.sample_id,
                MalformedReason::ZeroDepth,
            )),
        }
    }

    tracing::debug!(
        retained = kept.len(),
        excluded = exclusions.len(),
        min_total_reads = config.min_total_reads,
        "CPM normalization complete"
    );

    Ok(CpmTable {
        records: kept,
        exclusions,
        config: *config,
    })
}

/// Normalize with the default depth filter and scale.
pub fn norm_cpm_default(records: &[SampleRecord]) -> Result<CpmTable> {
    norm_cpm(records, &CpmConfig::default())
}

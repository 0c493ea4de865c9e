//! Multiple testing correction for repeated pairwise tests.
//!
//! Pairwise cohort comparisons are reported uncorrected by default; a policy
//! can be configured when several comparisons share one dataset.

pub mod bh;

pub use bh::bh_adjust;

use serde::{Deserialize, Serialize};

/// Correction policy across a family of tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Report raw p-values only.
    #[default]
    None,
    /// Family-wise error control: `min(p * m, 1)`.
    Bonferroni,
    /// False discovery rate control.
    BenjaminiHochberg,
}

impl Correction {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bonferroni => "bonferroni",
            Self::BenjaminiHochberg => "benjamini_hochberg",
        }
    }

    /// Adjusted p-values in input order, or `None` when no correction applies.
    pub fn adjust(&self, p_values: &[f64]) -> Option<Vec<f64>> {
        match self {
            Self::None => None,
            Self::Bonferroni => Some(bonferroni_adjust(p_values)),
            Self::BenjaminiHochberg => Some(bh_adjust(p_values)),
        }
    }
}

/// Bonferroni-adjusted p-values.
pub fn bonferroni_adjust(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len() as f64;
    p_values.iter().map(|&p| (p * m).min(1.0)).collect()
}

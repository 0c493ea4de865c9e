//! Fixed-width age binning for infant cohorts.
//!
//! Bins are right-closed: bin `i` covers `(i*w - 1, (i+1)*w - 1]` days, the
//! first bin also includes its lower edge, and the last bin ends at
//! `max_age`. Labels come from the binning parameters only, so axis order
//! is stable regardless of which ages appear in the data.

use crate::error::{BilrError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of bins a binning may define.
pub const MAX_AGE_BINS: usize = 10_000;

/// Parameters of an age discretization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeBinning {
    /// Bin width in days.
    pub width: u32,
    /// Largest age retained, inclusive.
    pub max_age: f64,
    /// Label the last bin `"{lower}+"` instead of `"{lower}-{upper}"`.
    pub open_last: bool,
}

impl AgeBinning {
    /// First year of life: 13 bins of 30 days, `0-29` through `360+`.
    pub fn year() -> Self {
        Self {
            width: 30,
            max_age: 365.0,
            open_last: true,
        }
    }

    /// First three months: 18 bins of 5 days, `0-4` through `85-89`.
    pub fn three_month() -> Self {
        Self {
            width: 5,
            max_age: 89.0,
            open_last: false,
        }
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(BilrError::InvalidParameter(
                "Age bin width must be positive".to_string(),
            ));
        }
        if !self.max_age.is_finite() || self.max_age < 0.0 {
            return Err(BilrError::InvalidParameter(format!(
                "Maximum age must be finite and non-negative, got {}",
                self.max_age
            )));
        }
        let whole_bins = (self.max_age / self.width as f64).floor();
        if whole_bins >= MAX_AGE_BINS as f64 {
            return Err(BilrError::InvalidParameter(format!(
                "Age binning of width {} up to {} days exceeds {} bins",
                self.width, self.max_age, MAX_AGE_BINS
            )));
        }
        Ok(())
    }

    /// Number of bins covering `[0, max_age]`.
    pub fn n_bins(&self) -> usize {
        ((self.max_age / self.width as f64).floor() as usize).saturating_add(1)
    }

    /// Inclusive upper edge of bin `i`.
    fn upper_edge(&self, i: usize) -> f64 {
        if i + 1 == self.n_bins() {
            self.max_age
        } else {
            ((i as u64 + 1) * self.width as u64) as f64 - 1.0
        }
    }

    /// Bin labels in display order.
    pub fn labels(&self) -> Vec<String> {
        let n = self.n_bins();
        let w = self.width as u64;
        (0..n)
            .map(|i| {
                let lower = i as u64 * w;
                if i + 1 == n && self.open_last {
                    format!("{}+", lower)
                } else {
                    format!("{}-{}", lower, lower + w - 1)
                }
            })
            .collect()
    }

    /// Check if an age falls in `[0, max_age]`.
    pub fn in_range(&self, age: f64) -> bool {
        age >= 0.0 && age <= self.max_age
    }

    /// Index of the bin containing `age`, or `None` when out of range.
    pub fn bin_index(&self, age: f64) -> Option<usize> {
        if !self.in_range(age) {
            return None;
        }
        // Guess from the width, then step to the right-closed bin.
        let n = self.n_bins();
        let mut i = (((age + 1.0) / self.width as f64).floor() as usize).min(n - 1);
        while i > 0 && age <= self.upper_edge(i - 1) {
            i -= 1;
        }
        while age > self.upper_edge(i) && i + 1 < n {
            i += 1;
        }
        Some(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_labels() {
        let binning = AgeBinning::year();
        let labels = binning.labels();

        assert_eq!(binning.n_bins(), 13);
        assert_eq!(labels.first().unwrap(), "0-29");
        assert_eq!(labels[1], "30-59");
        assert_eq!(labels[11], "330-359");
        assert_eq!(labels.last().unwrap(), "360+");
    }

    #[test]
    fn test_three_month_labels() {
        let binning = AgeBinning::three_month();
        let labels = binning.labels();

        assert_eq!(binning.n_bins(), 18);
        assert_eq!(labels.first().unwrap(), "0-4");
        assert_eq!(labels.last().unwrap(), "85-89");
    }

    #[test]
    fn test_right_closed_edges() {
        let binning = AgeBinning::year();

        assert_eq!(binning.bin_index(0.0), Some(0));
        assert_eq!(binning.bin_index(29.0), Some(0));
        assert_eq!(binning.bin_index(29.5), Some(1));
        assert_eq!(binning.bin_index(30.0), Some(1));
        assert_eq!(binning.bin_index(59.0), Some(1));
        assert_eq!(binning.bin_index(60.0), Some(2));
        assert_eq!(binning.bin_index(359.0), Some(11));
        assert_eq!(binning.bin_index(360.0), Some(12));
        assert_eq!(binning.bin_index(365.0), Some(12));
    }

    #[test]
    fn test_out_of_range() {
        let binning = AgeBinning::year();
        assert_eq!(binning.bin_index(-0.5), None);
        assert_eq!(binning.bin_index(365.5), None);

        let fine = AgeBinning::three_month();
        assert_eq!(fine.bin_index(89.0), Some(17));
        assert_eq!(fine.bin_index(90.0), None);
    }

    #[test]
    fn test_partition_is_exhaustive() {
        let binning = AgeBinning::year();
        let mut counts = vec![0usize; binning.n_bins()];

        for day in 0..=365 {
            let idx = binning.bin_index(day as f64).unwrap();
            counts[idx] += 1;
        }

        assert_eq!(counts.iter().sum::<usize>(), 366);
        assert!(counts[..12].iter().all(|&c| c == 30));
        assert_eq!(counts[12], 6);
    }

    #[test]
    fn test_fractional_ages_are_monotone() {
        let binning = AgeBinning::three_month();
        let mut prev = 0;
        let mut age = 0.0;
        while age <= 89.0 {
            let idx = binning.bin_index(age).unwrap();
            assert!(idx >= prev);
            prev = idx;
            age += 0.25;
        }
    }

    #[test]
    fn test_too_many_bins_rejected() {
        let binning = AgeBinning {
            width: 1,
            max_age: 1.0e30,
            open_last: false,
        };
        assert_eq!(binning.n_bins(), usize::MAX);
        assert!(matches!(
            binning.validate(),
            Err(BilrError::InvalidParameter(_))
        ));

        let widest = AgeBinning {
            width: 1,
            max_age: (MAX_AGE_BINS - 1) as f64,
            open_last: false,
        };
        widest.validate().unwrap();
        assert_eq!(widest.n_bins(), MAX_AGE_BINS);
    }

    #[test]
    fn test_invalid_binning() {
        let binning = AgeBinning {
            width: 0,
            max_age: 10.0,
            open_last: false,
        };
        assert!(binning.validate().is_err());
    }
}

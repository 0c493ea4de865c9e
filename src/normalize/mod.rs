//! Read count normalization.

pub mod cpm;

pub use cpm::{
    cpm, norm_cpm, norm_cpm_default, CpmConfig, CpmTable, NormalizedRecord, CPM_SCALE,
    DEFAULT_MIN_TOTAL_READS,
};

//! Cohort construction: disease groups, infant age bins, and composites.

pub mod age;
pub mod builder;
pub mod scheme;

pub use age::{AgeBinning, MAX_AGE_BINS};
pub use builder::{concat_cohorts, Cohort, CohortBuilder, CohortSet};
pub use scheme::{CohortScheme, CompositeMember, HEALTHY, INFANT};

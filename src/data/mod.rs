//! Data structures for sample tables, exclusions, and results.

mod diagnostics;
mod record;
mod result;

pub use diagnostics::{Diagnostics, Exclusion, FilterReason, MalformedReason};
pub use record::{HostAge, RawSampleRow, SampleRecord, SampleTable, REQUIRED_COLUMNS};
pub use result::{AnalysisOutput, PipelineOutput};

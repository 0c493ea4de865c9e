//! Presence/absence classification.

pub mod presence;

pub use presence::{ClassifiedRecord, Classifier, Presence, DEFAULT_CPM_THRESHOLD};

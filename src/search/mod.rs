//! Search and query predicates.

mod filter;

pub use filter::{ClinicalTestFilter, ExperimentFilter};

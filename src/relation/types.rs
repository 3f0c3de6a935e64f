//! Data types for experiment/clinical-test links.

use crate::clinical_test::ClinicalTest;
use crate::experiment::Experiment;

/// Which sides of a pair record the link.
///
/// An association is stored twice: once in the experiment's
/// `clinical_test_ids` and once in the clinical test's `experiment_ids`.
/// After every successful operation the two agree. The one-sided states
/// appear only when an operation failed between its two writes.
///
/// # Example
///
/// ```rust
/// use trialdb::LinkState;
///
/// assert!(LinkState::from_sides(true, true).is_consistent());
/// assert_eq!(LinkState::from_sides(true, false), LinkState::ExperimentSideOnly);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Both sides reference each other.
    Linked,
    /// Neither side references the other.
    Unlinked,
    /// Only the experiment lists the clinical test.
    ExperimentSideOnly,
    /// Only the clinical test lists the experiment.
    ClinicalTestSideOnly,
}

impl LinkState {
    /// Classifies a pair from the two membership flags.
    pub const fn from_sides(experiment_side: bool, clinical_test_side: bool) -> Self {
        match (experiment_side, clinical_test_side) {
            (true, true) => Self::Linked,
            (false, false) => Self::Unlinked,
            (true, false) => Self::ExperimentSideOnly,
            (false, true) => Self::ClinicalTestSideOnly,
        }
    }

    /// Classifies a pair of loaded handles.
    pub fn of(experiment: &Experiment, clinical_test: &ClinicalTest) -> Self {
        Self::from_sides(
            experiment.references(clinical_test.id),
            clinical_test.references(experiment.id),
        )
    }

    /// Returns true if both sides agree.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Linked | Self::Unlinked)
    }
}

//! Search filtering for document queries.
//!
//! Filters are owned values (`Clone + Send + 'static`) so a store can move
//! them onto a blocking task and apply them during a table scan.

use std::collections::BTreeSet;

use crate::clinical_test::ClinicalTest;
use crate::experiment::Experiment;
use crate::types::ClinicalTestId;

/// Case-insensitive substring test.
///
/// `needle` must already be lowercase. An empty needle matches every
/// haystack, which is what makes an empty search term mean "all".
#[inline]
pub(crate) fn contains_folded(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

/// Filter for experiment searches.
///
/// Matches when the term is a case-insensitive substring of
/// `experiment_number`, `title`, or `author`.
///
/// # Example
///
/// ```rust
/// use trialdb::ExperimentFilter;
///
/// let everything = ExperimentFilter::all();
/// assert!(everything.is_match_all());
///
/// let by_author = ExperimentFilter::term("okafor");
/// assert_eq!(by_author.needle(), "okafor");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExperimentFilter {
    needle: String,
}

impl ExperimentFilter {
    /// A filter that matches every experiment.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter for the given search term.
    pub fn term(term: &str) -> Self {
        Self {
            needle: term.to_lowercase(),
        }
    }

    /// The lowercased search term.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Returns true if this filter matches every experiment.
    pub fn is_match_all(&self) -> bool {
        self.needle.is_empty()
    }

    /// Returns `true` if the given experiment passes the filter.
    pub fn matches(&self, experiment: &Experiment) -> bool {
        contains_folded(&experiment.experiment_number, &self.needle)
            || contains_folded(&experiment.title, &self.needle)
            || contains_folded(&experiment.author, &self.needle)
    }
}

/// Filter for clinical test queries.
///
/// Optionally restricted to an id set (the references of one experiment),
/// then matched by case-insensitive substring on `name` or `description`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClinicalTestFilter {
    /// Only include clinical tests with these ids. `None` means any id.
    ids: Option<BTreeSet<ClinicalTestId>>,
    needle: String,
}

impl ClinicalTestFilter {
    /// A filter that matches every clinical test.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter for clinical tests referenced by `experiment` whose text
    /// fields contain `term`.
    pub fn linked_to(experiment: &Experiment, term: &str) -> Self {
        Self {
            ids: Some(experiment.clinical_test_ids.clone()),
            needle: term.to_lowercase(),
        }
    }

    /// The id restriction, if any.
    pub fn ids(&self) -> Option<&BTreeSet<ClinicalTestId>> {
        self.ids.as_ref()
    }

    /// Returns `true` if the given clinical test passes the filter.
    pub fn matches(&self, clinical_test: &ClinicalTest) -> bool {
        if let Some(ref ids) = self.ids {
            if !ids.contains(&clinical_test.id) {
                return false;
            }
        }

        contains_folded(&clinical_test.name, &self.needle)
            || contains_folded(&clinical_test.description, &self.needle)
    }
}

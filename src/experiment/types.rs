//! Data types for experiments.
//!
//! An experiment is the forward side of the experiment/clinical-test
//! relation: it carries the set of clinical test ids it is linked to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::clinical_test::ClinicalTest;
use crate::error::Result;
use crate::search::ClinicalTestFilter;
use crate::storage::DocumentStore;
use crate::types::{ClinicalTestId, ExperimentId, Timestamp};

/// A stored experiment document.
///
/// Experiments are value records: a handle is a snapshot of the stored
/// document at load time. Mutations only become durable through
/// [`save_to`](Self::save_to).
///
/// # Fields
///
/// - `experiment_number`, `title`, `author`: searchable text fields
/// - `clinical_test_ids`: forward references (unique, unordered)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Unique identifier (UUID v7).
    pub id: ExperimentId,

    /// Lab-assigned experiment number (e.g., "EXP-2024-017").
    pub experiment_number: String,

    /// Human-readable title.
    pub title: String,

    /// Author of the experiment. May be empty.
    pub author: String,

    /// Clinical tests this experiment is linked to.
    pub clinical_test_ids: BTreeSet<ClinicalTestId>,

    /// When this experiment was created.
    pub created_at: Timestamp,

    /// When this experiment was last modified.
    pub updated_at: Timestamp,
}

impl Experiment {
    /// Builds an experiment with no clinical tests from validated input.
    pub fn new(input: NewExperiment) -> Self {
        let now = Timestamp::now();
        Self {
            id: ExperimentId::new(),
            experiment_number: input.experiment_number,
            title: input.title,
            author: input.author,
            clinical_test_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this experiment references the clinical test.
    #[inline]
    pub fn references(&self, id: ClinicalTestId) -> bool {
        self.clinical_test_ids.contains(&id)
    }

    /// Adds a clinical test reference. Returns `false` if it was present.
    pub fn link(&mut self, id: ClinicalTestId) -> bool {
        let inserted = self.clinical_test_ids.insert(id);
        if inserted {
            self.updated_at = Timestamp::now();
        }
        inserted
    }

    /// Removes a clinical test reference. Returns `false` if it was absent.
    pub fn unlink(&mut self, id: ClinicalTestId) -> bool {
        let removed = self.clinical_test_ids.remove(&id);
        if removed {
            self.updated_at = Timestamp::now();
        }
        removed
    }

    /// Persists this experiment (upsert by id).
    ///
    /// # Errors
    ///
    /// Propagates any store failure unchanged.
    pub async fn save_to(&self, store: &dyn DocumentStore) -> Result<()> {
        store.save_experiment(self).await
    }

    /// Removes this experiment's document.
    ///
    /// Does not touch linked clinical tests; use
    /// [`RelationshipManager::delete_experiment`](crate::RelationshipManager::delete_experiment)
    /// for the cascading delete.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document is already gone.
    pub async fn remove_from(&self, store: &dyn DocumentStore) -> Result<()> {
        store.remove_experiment(self.id).await
    }

    /// Lists the stored clinical tests this experiment references whose
    /// `name` or `description` contains `term` (case-insensitive).
    ///
    /// An empty term lists every referenced clinical test. Ids with no
    /// stored document are skipped.
    ///
    /// Costs one point lookup per referenced id, independent of how many
    /// clinical tests the store holds. Results are in id order.
    pub async fn list_clinical_tests(
        &self,
        store: &dyn DocumentStore,
        term: &str,
    ) -> Result<Vec<ClinicalTest>> {
        let filter = ClinicalTestFilter::linked_to(self, term);

        let mut found = Vec::with_capacity(self.clinical_test_ids.len());
        for id in &self.clinical_test_ids {
            if let Some(clinical_test) = store.get_clinical_test(*id).await? {
                if filter.matches(&clinical_test) {
                    found.push(clinical_test);
                }
            }
        }
        Ok(found)
    }
}

/// Input for creating a new experiment.
///
/// # Example
///
/// ```rust,ignore
/// use trialdb::NewExperiment;
///
/// let id = db
///     .create_experiment(NewExperiment {
///         experiment_number: "EXP-001".into(),
///         title: "Dose response".into(),
///         author: "R. Okafor".into(),
///     })
///     .await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct NewExperiment {
    /// Lab-assigned experiment number. Required.
    pub experiment_number: String,

    /// Human-readable title. Required.
    pub title: String,

    /// Author. Optional (may be empty).
    pub author: String,
}

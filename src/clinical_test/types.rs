//! Data types for clinical tests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::DocumentStore;
use crate::types::{ClinicalTestId, ExperimentId, Timestamp};

/// A clinical test document: the reverse side of the relation.
///
/// A stored clinical test always has at least one entry in
/// `experiment_ids`. A handle may briefly hold an empty set in memory
/// (a freshly built test before its first associate, or one whose last
/// link was just removed), but it is never persisted that way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalTest {
    /// Unique identifier (UUID v7).
    pub id: ClinicalTestId,

    /// Name of the test (e.g., "Complete blood count").
    pub name: String,

    /// Free-text description. May be empty.
    pub description: String,

    /// Experiments this clinical test is linked to.
    pub experiment_ids: BTreeSet<ExperimentId>,

    /// When this clinical test was created.
    pub created_at: Timestamp,

    /// When this clinical test was last modified.
    pub updated_at: Timestamp,
}

impl ClinicalTest {
    /// Builds an unlinked, unsaved clinical test.
    ///
    /// Persist it by associating it with an experiment, never by saving it
    /// directly.
    pub fn new(input: NewClinicalTest) -> Self {
        let now = Timestamp::now();
        Self {
            id: ClinicalTestId::new(),
            name: input.name,
            description: input.description,
            experiment_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this clinical test references the experiment.
    #[inline]
    pub fn references(&self, id: ExperimentId) -> bool {
        self.experiment_ids.contains(&id)
    }

    /// Returns true if no experiment references remain.
    #[inline]
    pub fn is_orphaned(&self) -> bool {
        self.experiment_ids.is_empty()
    }

    /// Adds an experiment reference. Returns `false` if it was present.
    pub fn link(&mut self, id: ExperimentId) -> bool {
        let inserted = self.experiment_ids.insert(id);
        if inserted {
            self.updated_at = Timestamp::now();
        }
        inserted
    }

    /// Removes an experiment reference. Returns `false` if it was absent.
    pub fn unlink(&mut self, id: ExperimentId) -> bool {
        let removed = self.experiment_ids.remove(&id);
        if removed {
            self.updated_at = Timestamp::now();
        }
        removed
    }

    /// Persists this clinical test (upsert by id).
    pub async fn save_to(&self, store: &dyn DocumentStore) -> Result<()> {
        store.save_clinical_test(self).await
    }

    /// Removes this clinical test's document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document is already gone.
    pub async fn remove_from(&self, store: &dyn DocumentStore) -> Result<()> {
        store.remove_clinical_test(self.id).await
    }
}

/// Input for creating a clinical test attached to an experiment.
#[derive(Clone, Debug, Default)]
pub struct NewClinicalTest {
    /// Name of the test. Required.
    pub name: String,

    /// Free-text description. Optional.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clinical_test_is_orphaned() {
        let ct = ClinicalTest::new(NewClinicalTest {
            name: "CBC".into(),
            description: String::new(),
        });
        assert!(ct.is_orphaned());
        assert_eq!(ct.name, "CBC");
    }

    #[test]
    fn test_link_and_unlink_round() {
        let mut ct = ClinicalTest::new(NewClinicalTest::default());
        let e1 = ExperimentId::new();
        let e2 = ExperimentId::new();

        assert!(ct.link(e1));
        assert!(ct.link(e2));
        assert!(!ct.link(e1));
        assert_eq!(ct.experiment_ids.len(), 2);

        assert!(ct.unlink(e1));
        assert!(!ct.is_orphaned());
        assert!(ct.unlink(e2));
        assert!(ct.is_orphaned());
        assert!(!ct.unlink(e2));
    }

    #[test]
    fn test_clinical_test_bincode_roundtrip() {
        let mut ct = ClinicalTest::new(NewClinicalTest {
            name: "Lipid panel".into(),
            description: "fasting".into(),
        });
        ct.link(ExperimentId::new());

        let bytes = bincode::serialize(&ct).unwrap();
        let restored: ClinicalTest = bincode::deserialize(&bytes).unwrap();
        assert_eq!(ct, restored);
    }
}

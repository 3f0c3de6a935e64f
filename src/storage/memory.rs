//! In-memory document store using `DashMap`.
//!
//! Data is lost on process restart. Useful for tests and for callers that
//! keep durable state elsewhere.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::DocumentStore;
use crate::clinical_test::ClinicalTest;
use crate::error::{NotFoundError, Result};
use crate::experiment::Experiment;
use crate::search::{ClinicalTestFilter, ExperimentFilter};
use crate::types::{ClinicalTestId, ExperimentId};

/// In-memory document store.
///
/// Each collection is a sharded concurrent hashmap, so every operation is
/// atomic for the one document it touches, matching the contract of the
/// persistent backend. Query results are returned in id order.
///
/// # Example
///
/// ```rust
/// use trialdb::{DocumentStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// assert!(store.is_empty());
/// assert!(store.path().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    experiments: DashMap<ExperimentId, Experiment>,
    clinical_tests: DashMap<ClinicalTestId, ClinicalTest>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored experiments.
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of stored clinical tests.
    pub fn clinical_test_count(&self) -> usize {
        self.clinical_tests.len()
    }

    /// Returns true if neither collection holds any document.
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.clinical_tests.is_empty()
    }

    /// Removes every document.
    pub fn clear(&self) {
        self.experiments.clear();
        self.clinical_tests.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn path(&self) -> Option<&Path> {
        None
    }

    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        self.experiments.insert(experiment.id, experiment.clone());
        debug!(id = %experiment.id, "Experiment saved");
        Ok(())
    }

    async fn get_experiment(&self, id: ExperimentId) -> Result<Option<Experiment>> {
        Ok(self.experiments.get(&id).map(|e| e.value().clone()))
    }

    async fn remove_experiment(&self, id: ExperimentId) -> Result<()> {
        match self.experiments.remove(&id) {
            Some(_) => {
                debug!(id = %id, "Experiment removed");
                Ok(())
            }
            None => Err(NotFoundError::experiment(id).into()),
        }
    }

    async fn query_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>> {
        let mut experiments: Vec<Experiment> = self
            .experiments
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        experiments.sort_by_key(|e| e.id);
        Ok(experiments)
    }

    async fn save_clinical_test(&self, clinical_test: &ClinicalTest) -> Result<()> {
        self.clinical_tests
            .insert(clinical_test.id, clinical_test.clone());
        debug!(id = %clinical_test.id, "Clinical test saved");
        Ok(())
    }

    async fn get_clinical_test(&self, id: ClinicalTestId) -> Result<Option<ClinicalTest>> {
        Ok(self.clinical_tests.get(&id).map(|c| c.value().clone()))
    }

    async fn remove_clinical_test(&self, id: ClinicalTestId) -> Result<()> {
        match self.clinical_tests.remove(&id) {
            Some(_) => {
                debug!(id = %id, "Clinical test removed");
                Ok(())
            }
            None => Err(NotFoundError::clinical_test(id).into()),
        }
    }

    async fn query_clinical_tests(
        &self,
        filter: &ClinicalTestFilter,
    ) -> Result<Vec<ClinicalTest>> {
        let mut clinical_tests: Vec<ClinicalTest> = self
            .clinical_tests
            .iter()
            .filter(|c| filter.matches(c.value()))
            .map(|c| c.value().clone())
            .collect();
        clinical_tests.sort_by_key(|c| c.id);
        Ok(clinical_tests)
    }
}

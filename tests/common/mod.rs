//! Shared helpers for TrialDB integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};
use trialdb::{
    ClinicalTest, ClinicalTestFilter, ClinicalTestId, Config, DocumentStore, Experiment,
    ExperimentFilter, ExperimentId, MemoryStore, NewClinicalTest, NewExperiment, Result,
    StorageError, TrialDB,
};

/// Opens a fresh redb-backed database in a temp directory.
pub fn open_db() -> (TrialDB, TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = TrialDB::open(&path, Config::default()).unwrap();
    (db, dir)
}

/// Minimal valid experiment input.
pub fn new_experiment(number: &str, title: &str, author: &str) -> NewExperiment {
    NewExperiment {
        experiment_number: number.to_string(),
        title: title.to_string(),
        author: author.to_string(),
    }
}

/// Minimal valid clinical test input.
pub fn new_clinical_test(name: &str) -> NewClinicalTest {
    NewClinicalTest {
        name: name.to_string(),
        description: format!("{name} protocol"),
    }
}

/// A store that delegates to [`MemoryStore`] and fails one chosen write.
///
/// Writes are saves and removes of either collection, counted from 1.
/// Reads never fail; collection scans are counted separately.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    fail_at: AtomicUsize,
    clinical_test_scans: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the `n`th write from now fail. `0` disables injection.
    pub fn fail_nth_write(&self, n: usize) {
        let now = self.writes.load(Ordering::SeqCst);
        let target = if n == 0 { 0 } else { now + n };
        self.fail_at.store(target, Ordering::SeqCst);
    }

    /// Total writes attempted so far, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `query_clinical_tests` calls so far.
    pub fn clinical_test_scans(&self) -> usize {
        self.clinical_test_scans.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn record_write(&self) -> Result<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_at.load(Ordering::SeqCst) {
            return Err(StorageError::backend(format!("injected failure on write {n}")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    fn path(&self) -> Option<&Path> {
        None
    }

    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        self.record_write()?;
        self.inner.save_experiment(experiment).await
    }

    async fn get_experiment(&self, id: ExperimentId) -> Result<Option<Experiment>> {
        self.inner.get_experiment(id).await
    }

    async fn remove_experiment(&self, id: ExperimentId) -> Result<()> {
        self.record_write()?;
        self.inner.remove_experiment(id).await
    }

    async fn query_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>> {
        self.inner.query_experiments(filter).await
    }

    async fn save_clinical_test(&self, clinical_test: &ClinicalTest) -> Result<()> {
        self.record_write()?;
        self.inner.save_clinical_test(clinical_test).await
    }

    async fn get_clinical_test(&self, id: ClinicalTestId) -> Result<Option<ClinicalTest>> {
        self.inner.get_clinical_test(id).await
    }

    async fn remove_clinical_test(&self, id: ClinicalTestId) -> Result<()> {
        self.record_write()?;
        self.inner.remove_clinical_test(id).await
    }

    async fn query_clinical_tests(
        &self,
        filter: &ClinicalTestFilter,
    ) -> Result<Vec<ClinicalTest>> {
        self.clinical_test_scans.fetch_add(1, Ordering::SeqCst);
        self.inner.query_clinical_tests(filter).await
    }
}

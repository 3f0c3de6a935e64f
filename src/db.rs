//! TrialDB main struct and lifecycle operations.
//!
//! The [`TrialDB`] struct is the primary interface for interacting with
//! the database. It provides methods for:
//!
//! - Opening and closing the database
//! - Creating and loading experiments and clinical tests
//! - Linking, unlinking and cascading deletes by id
//! - Searching experiments and listing an experiment's clinical tests
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trialdb::{Config, NewClinicalTest, NewExperiment, TrialDB};
//!
//! let db = TrialDB::open("./trials.db", Config::default())?;
//!
//! let experiment = db.create_experiment(NewExperiment {
//!     experiment_number: "EXP-001".into(),
//!     title: "Dose escalation".into(),
//!     ..Default::default()
//! }).await?;
//!
//! let test = db.add_clinical_test(experiment, NewClinicalTest {
//!     name: "Complete blood count".into(),
//!     ..Default::default()
//! }).await?;
//!
//! // Removing the only link deletes the clinical test.
//! db.disassociate(experiment, test).await?;
//!
//! db.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `TrialDB` is `Send + Sync` and can be shared across tasks using `Arc`.
//! It holds no locks of its own; see [`RelationshipManager`] for the
//! consistency model.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::clinical_test::{validate_new_clinical_test, ClinicalTest, NewClinicalTest};
use crate::config::Config;
use crate::error::{NotFoundError, Result, StorageError, TrialDBError};
use crate::experiment::{validate_new_experiment, Experiment, NewExperiment};
use crate::relation::{LinkState, RelationshipManager};
use crate::storage::{open_store, DocumentStore, MemoryStore};
use crate::types::{ClinicalTestId, ExperimentId};

/// The main TrialDB database handle.
///
/// Create an instance with [`TrialDB::open()`] for a persistent file, or
/// inject any [`DocumentStore`] with [`TrialDB::with_store()`]. Close it
/// with [`TrialDB::close()`].
///
/// Every id-based operation loads fresh handles from the store, so the
/// facade never works from stale copies.
pub struct TrialDB {
    /// Relationship manager, which owns the shared store handle.
    manager: RelationshipManager,

    /// Configuration used to open this database.
    config: Config,
}

impl std::fmt::Debug for TrialDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialDB")
            .field("config", &self.config)
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

impl TrialDB {
    /// Opens or creates a TrialDB database at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - The database file cannot be opened or is locked by another process
    /// - Database file is corrupted
    /// - Schema version doesn't match
    ///
    /// The first two surface as [`TrialDBError::Config`].
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        validate_config(&config)?;

        info!("Opening TrialDB");

        let store = open_store(&path, &config).map_err(|e| match e {
            TrialDBError::Storage(StorageError::DatabaseLocked) => {
                TrialDBError::config("database is locked by another process")
            }
            TrialDBError::Storage(StorageError::Redb(reason)) => {
                TrialDBError::config(format!("cannot open database: {reason}"))
            }
            other => other,
        })?;

        info!(sync_mode = ?config.sync_mode, "TrialDB opened successfully");

        Ok(Self::from_parts(store, config))
    }

    /// Creates a database over an existing store.
    ///
    /// Use this to plug in a custom adapter or a shared store.
    ///
    /// # Errors
    ///
    /// Returns [`TrialDBError::Config`] if the configuration is invalid.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: Config) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self::from_parts(store, config))
    }

    /// Creates a database backed by a fresh [`MemoryStore`].
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    fn from_parts(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            manager: RelationshipManager::with_config(store, &config),
            config,
        }
    }

    /// Closes the database.
    ///
    /// Consumes the handle. Every write was committed when its operation
    /// returned, so there is nothing left to flush; the file lock is
    /// released once the last clone of the store is dropped.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing TrialDB");
        drop(self.manager);
        info!("TrialDB closed successfully");
        Ok(())
    }

    /// Returns a reference to the database configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database file path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.manager.store().path()
    }

    /// Returns the relationship manager for handle-based operations.
    #[inline]
    pub fn manager(&self) -> &RelationshipManager {
        &self.manager
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Validates and stores a new experiment with no clinical tests.
    #[instrument(skip(self, input))]
    pub async fn create_experiment(&self, input: NewExperiment) -> Result<ExperimentId> {
        validate_new_experiment(&input)?;

        let experiment = Experiment::new(input);
        experiment.save_to(self.manager.store()).await?;

        info!(id = %experiment.id, "Experiment created");
        Ok(experiment.id)
    }

    /// Retrieves an experiment by id.
    pub async fn get_experiment(&self, id: ExperimentId) -> Result<Option<Experiment>> {
        self.manager.store().get_experiment(id).await
    }

    /// Creates a clinical test linked to an existing experiment.
    ///
    /// The clinical test is first written already carrying the link, after
    /// the experiment has been updated, so it never exists unlinked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the experiment does not exist, or a validation
    /// error for bad input.
    #[instrument(skip(self, input), fields(experiment = %experiment_id))]
    pub async fn add_clinical_test(
        &self,
        experiment_id: ExperimentId,
        input: NewClinicalTest,
    ) -> Result<ClinicalTestId> {
        validate_new_clinical_test(&input)?;

        let mut experiment = self.load_experiment(experiment_id).await?;
        let mut clinical_test = ClinicalTest::new(input);
        self.manager
            .associate(&mut experiment, &mut clinical_test)
            .await?;

        info!(id = %clinical_test.id, "Clinical test created");
        Ok(clinical_test.id)
    }

    /// Retrieves a clinical test by id.
    pub async fn get_clinical_test(&self, id: ClinicalTestId) -> Result<Option<ClinicalTest>> {
        self.manager.store().get_clinical_test(id).await
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// Links a stored experiment and a stored clinical test.
    ///
    /// See [`RelationshipManager::associate`].
    pub async fn associate(
        &self,
        experiment_id: ExperimentId,
        clinical_test_id: ClinicalTestId,
    ) -> Result<()> {
        let mut experiment = self.load_experiment(experiment_id).await?;
        let mut clinical_test = self.load_clinical_test(clinical_test_id).await?;
        self.manager
            .associate(&mut experiment, &mut clinical_test)
            .await
    }

    /// Unlinks a stored experiment and clinical test, deleting the clinical
    /// test if no experiments remain.
    ///
    /// See [`RelationshipManager::disassociate`].
    pub async fn disassociate(
        &self,
        experiment_id: ExperimentId,
        clinical_test_id: ClinicalTestId,
    ) -> Result<()> {
        let mut experiment = self.load_experiment(experiment_id).await?;
        let mut clinical_test = self.load_clinical_test(clinical_test_id).await?;
        self.manager
            .disassociate(&mut experiment, &mut clinical_test)
            .await
    }

    /// Deletes an experiment, cascading to its clinical tests.
    ///
    /// See [`RelationshipManager::delete_experiment`].
    pub async fn delete_experiment(&self, id: ExperimentId) -> Result<()> {
        let mut experiment = self.load_experiment(id).await?;
        self.manager.delete_experiment(&mut experiment).await
    }

    /// Deletes a clinical test and removes it from every experiment.
    ///
    /// See [`RelationshipManager::delete_clinical_test`].
    pub async fn delete_clinical_test(&self, id: ClinicalTestId) -> Result<()> {
        let mut clinical_test = self.load_clinical_test(id).await?;
        self.manager.delete_clinical_test(&mut clinical_test).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns experiments whose number, title or author contains `term`,
    /// ignoring case. An empty term returns every experiment.
    pub async fn search_experiments(&self, term: &str) -> Result<Vec<Experiment>> {
        self.manager.search_experiments(term).await
    }

    /// Returns the clinical tests linked to an experiment whose name or
    /// description contains `term`, ignoring case.
    pub async fn list_clinical_tests(
        &self,
        experiment_id: ExperimentId,
        term: &str,
    ) -> Result<Vec<ClinicalTest>> {
        let experiment = self.load_experiment(experiment_id).await?;
        experiment
            .list_clinical_tests(self.manager.store(), term)
            .await
    }

    /// Reports which stored documents record the link between two ids.
    ///
    /// A missing clinical test counts as not recording the link, so a pair
    /// whose clinical test was never written shows as
    /// [`LinkState::ExperimentSideOnly`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the experiment does not exist.
    pub async fn link_state(
        &self,
        experiment_id: ExperimentId,
        clinical_test_id: ClinicalTestId,
    ) -> Result<LinkState> {
        let experiment = self.load_experiment(experiment_id).await?;
        let clinical_test_side = self
            .get_clinical_test(clinical_test_id)
            .await?
            .map(|ct| ct.references(experiment_id))
            .unwrap_or(false);

        let state = LinkState::from_sides(
            experiment.references(clinical_test_id),
            clinical_test_side,
        );
        debug!(?state, "Link state read");
        Ok(state)
    }

    async fn load_experiment(&self, id: ExperimentId) -> Result<Experiment> {
        self.get_experiment(id)
            .await?
            .ok_or_else(|| NotFoundError::experiment(id).into())
    }

    async fn load_clinical_test(&self, id: ClinicalTestId) -> Result<ClinicalTest> {
        self.get_clinical_test(id)
            .await?
            .ok_or_else(|| NotFoundError::clinical_test(id).into())
    }
}

fn validate_config(config: &Config) -> Result<()> {
    config
        .validate()
        .map_err(|e| TrialDBError::config(e.to_string()))
}

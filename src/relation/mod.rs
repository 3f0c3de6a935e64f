//! Relationship management between experiments and clinical tests.
//!
//! An **association** links one experiment and one clinical test. It is
//! stored redundantly, as an id in each document's reference set, because
//! the document store has no foreign keys, joins or cascades. The
//! [`RelationshipManager`] keeps the two sets consistent and enforces the
//! orphan rule: a clinical test left with no experiments is deleted.
//!
//! # Operations
//!
//! - [`associate`](RelationshipManager::associate)
//! - [`disassociate`](RelationshipManager::disassociate)
//! - [`delete_experiment`](RelationshipManager::delete_experiment)
//! - [`delete_clinical_test`](RelationshipManager::delete_clinical_test)
//! - [`search_experiments`](RelationshipManager::search_experiments)
//!
//! # Write Ordering
//!
//! Every operation writes the experiment side first, then the clinical
//! test side. The two writes are separate store calls; nothing makes them
//! atomic together. If the second fails, the pair is left one-sided
//! ([`LinkState::ExperimentSideOnly`] or [`LinkState::ClinicalTestSideOnly`])
//! and the error propagates. Re-running the same operation converges.
//!
//! Handles are only updated after their write succeeds, so a handle always
//! mirrors what the store last accepted for it and can be reused for a
//! retry.
//!
//! # Cascades
//!
//! Cascading deletes process related documents one at a time. Each
//! disassociation, including any orphan delete it triggers, completes
//! before the next starts. The first failure aborts the cascade and leaves
//! the remaining documents untouched.

pub mod types;

pub use types::LinkState;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::clinical_test::ClinicalTest;
use crate::config::{Config, DEFAULT_FULL_SCAN_WARN_THRESHOLD};
use crate::error::{Result, TrialDBError};
use crate::experiment::Experiment;
use crate::search::ExperimentFilter;
use crate::storage::DocumentStore;

/// Maintains bidirectional consistency between experiments and clinical
/// tests over an injected [`DocumentStore`].
///
/// The manager holds no state besides the store handle and is cheap to
/// clone. It does no locking: callers must not mutate the same handle from
/// two operations at once, and concurrent writers to the same document are
/// resolved last-write-wins by the store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use trialdb::{
///     ClinicalTest, Experiment, MemoryStore, NewClinicalTest, NewExperiment,
///     RelationshipManager,
/// };
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let manager = RelationshipManager::new(Arc::new(MemoryStore::new()));
///
/// let mut experiment = Experiment::new(NewExperiment {
///     experiment_number: "EXP-1".into(),
///     title: "Baseline".into(),
///     ..Default::default()
/// });
/// experiment.save_to(manager.store()).await?;
///
/// let mut test = ClinicalTest::new(NewClinicalTest {
///     name: "CBC".into(),
///     ..Default::default()
/// });
/// manager.associate(&mut experiment, &mut test).await?;
/// assert!(experiment.references(test.id));
///
/// // Removing the last link deletes the clinical test.
/// manager.disassociate(&mut experiment, &mut test).await?;
/// assert!(manager.store().get_clinical_test(test.id).await?.is_none());
/// # Ok::<(), trialdb::TrialDBError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct RelationshipManager {
    store: Arc<dyn DocumentStore>,
    full_scan_warn_threshold: usize,
}

impl std::fmt::Debug for RelationshipManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipManager")
            .field("store_path", &self.store.path())
            .field("full_scan_warn_threshold", &self.full_scan_warn_threshold)
            .finish()
    }
}

impl RelationshipManager {
    /// Creates a manager over the given store with default settings.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            full_scan_warn_threshold: DEFAULT_FULL_SCAN_WARN_THRESHOLD,
        }
    }

    /// Creates a manager over the given store using `config`.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            store,
            full_scan_warn_threshold: config.full_scan_warn_threshold,
        }
    }

    /// Returns the store this manager writes through.
    #[inline]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Links an experiment and a clinical test.
    ///
    /// No writes are issued when both sides already reference each other.
    /// Otherwise each side that lacks the reference gains it and is saved,
    /// experiment first. A side that already holds the reference is not
    /// rewritten, which is what lets a retry repair a one-sided link.
    ///
    /// `clinical_test` may be a freshly built handle that has never been
    /// stored; its first save happens here, already carrying the link.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure. On failure after the experiment
    /// write, the pair is [`LinkState::ExperimentSideOnly`].
    #[instrument(skip_all, fields(experiment = %experiment.id, clinical_test = %clinical_test.id))]
    pub async fn associate(
        &self,
        experiment: &mut Experiment,
        clinical_test: &mut ClinicalTest,
    ) -> Result<()> {
        if LinkState::of(experiment, clinical_test) == LinkState::Linked {
            debug!("Already associated, nothing to write");
            return Ok(());
        }

        if !experiment.references(clinical_test.id) {
            let mut updated = experiment.clone();
            updated.link(clinical_test.id);
            updated.save_to(self.store()).await?;
            *experiment = updated;
        }

        if !clinical_test.references(experiment.id) {
            let mut updated = clinical_test.clone();
            updated.link(experiment.id);
            updated.save_to(self.store()).await?;
            *clinical_test = updated;
        }

        debug!("Associated");
        Ok(())
    }

    /// Removes the link between an experiment and a clinical test.
    ///
    /// Does not check that the link exists; removing an absent id is a
    /// no-op at the set level, though both documents are still written.
    /// The experiment is saved first. Then, if the clinical test has no
    /// experiments left, its document is removed (orphan rule); otherwise
    /// it is saved.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure. Removing an orphaned clinical
    /// test whose document does not exist is a `NotFound` error.
    #[instrument(skip_all, fields(experiment = %experiment.id, clinical_test = %clinical_test.id))]
    pub async fn disassociate(
        &self,
        experiment: &mut Experiment,
        clinical_test: &mut ClinicalTest,
    ) -> Result<()> {
        let mut updated = experiment.clone();
        updated.unlink(clinical_test.id);
        updated.save_to(self.store()).await?;
        *experiment = updated;

        let mut updated = clinical_test.clone();
        updated.unlink(experiment.id);
        if updated.is_orphaned() {
            updated.remove_from(self.store()).await?;
            debug!("Clinical test orphaned and removed");
        } else {
            updated.save_to(self.store()).await?;
        }
        *clinical_test = updated;

        debug!("Disassociated");
        Ok(())
    }

    /// Deletes an experiment and severs all of its links.
    ///
    /// Loads every clinical test the experiment references (an empty-term
    /// listing), disassociates each in turn, deleting those left orphaned,
    /// then removes the experiment document. Clinical tests still linked
    /// to other experiments survive without this experiment's id.
    ///
    /// # Errors
    ///
    /// Aborts on the first failure. Already-severed links stay severed;
    /// the whole call is safe to retry with the same handle.
    #[instrument(skip_all, fields(experiment = %experiment.id))]
    pub async fn delete_experiment(&self, experiment: &mut Experiment) -> Result<()> {
        let related = experiment.list_clinical_tests(self.store(), "").await?;
        let total = related.len();

        let mut orphaned = 0usize;
        for mut clinical_test in related {
            self.disassociate(experiment, &mut clinical_test).await?;
            if clinical_test.is_orphaned() {
                orphaned += 1;
            }
        }

        experiment.remove_from(self.store()).await?;

        info!(
            clinical_tests = total,
            orphaned_removed = orphaned,
            "Experiment deleted"
        );
        Ok(())
    }

    /// Deletes a clinical test and removes it from every experiment.
    ///
    /// There is no reverse index from clinical tests to experiments, so
    /// this scans every experiment (an empty-term search), keeps those
    /// referencing the clinical test, and disassociates each. The last
    /// disassociation deletes the clinical test through the orphan rule.
    ///
    /// Cost is O(total experiments) per call. A warning is logged when the
    /// scan exceeds the configured threshold.
    ///
    /// An experiment may reference the clinical test without being listed
    /// back (a one-sided link). Once the clinical test lists no experiments,
    /// any remaining referencing experiments only have their own side
    /// cleared.
    ///
    /// If no experiment references the clinical test, or it still lists
    /// experiments that do not reference it back, its document is removed
    /// directly. A document that is already gone counts as removed, so the
    /// call always ends with the clinical test gone.
    ///
    /// # Errors
    ///
    /// Aborts on the first failure; safe to retry with the same handle.
    #[instrument(skip_all, fields(clinical_test = %clinical_test.id))]
    pub async fn delete_clinical_test(&self, clinical_test: &mut ClinicalTest) -> Result<()> {
        let experiments = self.store.query_experiments(&ExperimentFilter::all()).await?;
        let scanned = experiments.len();
        if scanned > self.full_scan_warn_threshold {
            warn!(
                scanned,
                threshold = self.full_scan_warn_threshold,
                "Clinical test delete scanned more experiments than the warning threshold"
            );
        }

        let referencing: Vec<Experiment> = experiments
            .into_iter()
            .filter(|e| e.references(clinical_test.id))
            .collect();
        let referencing_count = referencing.len();

        let mut removed = false;
        for mut experiment in referencing {
            if clinical_test.is_orphaned() {
                experiment.unlink(clinical_test.id);
                experiment.save_to(self.store()).await?;
                debug!(experiment = %experiment.id, "Cleared one-sided reference");
                continue;
            }
            self.disassociate(&mut experiment, clinical_test).await?;
            removed = clinical_test.is_orphaned();
        }

        if !removed {
            if !clinical_test.is_orphaned() {
                warn!(
                    stale_references = clinical_test.experiment_ids.len(),
                    "Clinical test listed experiments that do not reference it"
                );
            }
            match clinical_test.remove_from(self.store()).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!("Clinical test already removed"),
                Err(e) => return Err(e),
            }
            clinical_test.experiment_ids.clear();
        }

        info!(
            scanned,
            experiments_updated = referencing_count,
            "Clinical test deleted"
        );
        Ok(())
    }

    /// Returns every experiment whose number, title or author contains
    /// `term`, ignoring case. An empty term returns all experiments.
    #[instrument(skip(self))]
    pub async fn search_experiments(&self, term: &str) -> Result<Vec<Experiment>> {
        let experiments = self
            .store
            .query_experiments(&ExperimentFilter::term(term))
            .await?;
        debug!(results = experiments.len(), "Experiment search complete");
        Ok(experiments)
    }

    /// Classifies the link between two handles, failing on a one-sided
    /// link.
    ///
    /// # Errors
    ///
    /// Returns [`TrialDBError::InvariantGap`] when only one side records
    /// the link.
    pub fn verify_link(
        &self,
        experiment: &Experiment,
        clinical_test: &ClinicalTest,
    ) -> Result<LinkState> {
        check_consistent(LinkState::of(experiment, clinical_test), experiment, clinical_test)
    }
}

fn check_consistent(
    state: LinkState,
    experiment: &Experiment,
    clinical_test: &ClinicalTest,
) -> Result<LinkState> {
    if state.is_consistent() {
        Ok(state)
    } else {
        Err(TrialDBError::InvariantGap {
            experiment_id: experiment.id,
            clinical_test_id: clinical_test.id,
            state,
        })
    }
}

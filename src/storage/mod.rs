//! Document store abstractions for TrialDB.
//!
//! This module provides a trait-based abstraction over the document store,
//! so the relationship manager never depends on a particular backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RelationshipManager                         │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   DocumentStore     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │         ┌─────────┴─┐   ┌───┴─────────┐                    │
//! │         │ RedbStore │   │ MemoryStore │                    │
//! │         └───────────┘   └─────────────┘                    │
//! │           (prod)         (tests, demos)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contract
//!
//! - Every method touches exactly one document and is atomic for that
//!   document. There are no multi-document transactions.
//! - `save_*` is an upsert by id.
//! - `remove_*` of a missing document is an error (`NotFound`), never a
//!   silent no-op.
//! - `query_*` with a match-all filter returns the whole collection.

pub mod memory;
pub mod redb;
pub mod schema;

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;
pub use schema::{DatabaseMetadata, SCHEMA_VERSION};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::clinical_test::ClinicalTest;
use crate::config::Config;
use crate::error::Result;
use crate::experiment::Experiment;
use crate::search::{ClinicalTestFilter, ExperimentFilter};
use crate::types::{ClinicalTestId, ExperimentId};

/// Document store trait for TrialDB.
///
/// This trait defines the contract that any store adapter must implement.
/// The primary implementation is [`RedbStore`]; [`MemoryStore`] keeps
/// everything in process memory.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one store can be shared by
/// several managers through an `Arc`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the path to the database file, if applicable.
    ///
    /// In-memory implementations have no path.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Experiment Documents
    // =========================================================================

    /// Saves an experiment, overwriting any document with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction or serialization fails.
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()>;

    /// Retrieves an experiment by id.
    ///
    /// Returns `None` if no experiment with the given id exists.
    async fn get_experiment(&self, id: ExperimentId) -> Result<Option<Experiment>>;

    /// Deletes an experiment by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no experiment with the given id exists.
    async fn remove_experiment(&self, id: ExperimentId) -> Result<()>;

    /// Returns every experiment matching the filter.
    ///
    /// This is a scan over the whole collection.
    async fn query_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>>;

    // =========================================================================
    // Clinical Test Documents
    // =========================================================================

    /// Saves a clinical test, overwriting any document with the same id.
    async fn save_clinical_test(&self, clinical_test: &ClinicalTest) -> Result<()>;

    /// Retrieves a clinical test by id.
    async fn get_clinical_test(&self, id: ClinicalTestId) -> Result<Option<ClinicalTest>>;

    /// Deletes a clinical test by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no clinical test with the given id exists.
    async fn remove_clinical_test(&self, id: ClinicalTestId) -> Result<()>;

    /// Returns every clinical test matching the filter.
    async fn query_clinical_tests(&self, filter: &ClinicalTestFilter)
        -> Result<Vec<ClinicalTest>>;
}

/// Opens a document store at the given path.
///
/// This is a convenience function that creates a [`RedbStore`] instance.
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
pub fn open_store(path: impl AsRef<Path>, config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store = RedbStore::open(path, config)?;
    Ok(Arc::new(store))
}

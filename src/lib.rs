//! # TrialDB
//!
//! Embedded store for clinical experiments and the clinical tests run
//! under them, with referential integrity kept on top of a plain document
//! store.
//!
//! The store has no foreign keys, joins or cascading deletes. Each
//! experiment/clinical-test link is recorded on both documents, and
//! TrialDB keeps the two records in step: linking, unlinking, cascading
//! deletes and the orphan rule that removes a clinical test once no
//! experiment uses it.
//!
//! ## Quick Start
//!
//! ```rust
//! use trialdb::{Config, LinkState, NewClinicalTest, NewExperiment, TrialDB};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let db = TrialDB::in_memory(Config::default())?;
//!
//! let experiment = db
//!     .create_experiment(NewExperiment {
//!         experiment_number: "EXP-001".into(),
//!         title: "Dose escalation".into(),
//!         author: "Dr. Osei".into(),
//!     })
//!     .await?;
//!
//! let test = db
//!     .add_clinical_test(
//!         experiment,
//!         NewClinicalTest {
//!             name: "Complete blood count".into(),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! assert_eq!(db.link_state(experiment, test).await?, LinkState::Linked);
//!
//! // Deleting the experiment takes its now-orphaned clinical test with it.
//! db.delete_experiment(experiment).await?;
//! assert!(db.get_clinical_test(test).await?.is_none());
//!
//! db.close()?;
//! # Ok::<(), trialdb::TrialDBError>(())
//! # }).unwrap();
//! ```
//!
//! ## Key Concepts
//!
//! ### Experiment
//!
//! An **experiment** is a top-level study record. It owns the set of
//! clinical test ids it is linked to.
//!
//! ### Clinical Test
//!
//! A **clinical test** is linked to one or more experiments and holds the
//! reverse set of experiment ids. It is never kept without a link.
//!
//! ### Stores
//!
//! Persistence goes through the [`DocumentStore`] trait. [`RedbStore`]
//! writes to a single redb file; [`MemoryStore`] keeps documents in
//! memory.
//!
//! ## Thread Safety
//!
//! `TrialDB` is `Send + Sync` and can be shared across tasks using `Arc`.
//! Writes to a single document are atomic; operations spanning two
//! documents are not, and are made safe to re-run instead.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

pub mod storage;

// Domain modules
mod clinical_test;
mod experiment;
mod relation;
mod search;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::TrialDB;

// Configuration
pub use config::{Config, SyncMode, DEFAULT_FULL_SCAN_WARN_THRESHOLD};

// Error handling
pub use error::{NotFoundError, Result, StorageError, TrialDBError, ValidationError};

// Core types
pub use types::{ClinicalTestId, ExperimentId, Timestamp};

// Domain types
pub use clinical_test::{ClinicalTest, NewClinicalTest};
pub use experiment::{Experiment, NewExperiment};
pub use relation::{LinkState, RelationshipManager};

// Search
pub use search::{ClinicalTestFilter, ExperimentFilter};

// Storage (for advanced users)
pub use storage::{DatabaseMetadata, DocumentStore, MemoryStore, RedbStore};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common TrialDB usage.
///
/// ```rust
/// use trialdb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, SyncMode};
    pub use crate::db::TrialDB;
    pub use crate::error::{Result, TrialDBError};
    pub use crate::experiment::{Experiment, NewExperiment};
    pub use crate::clinical_test::{ClinicalTest, NewClinicalTest};
    pub use crate::relation::{LinkState, RelationshipManager};
    pub use crate::types::{ClinicalTestId, ExperimentId, Timestamp};
}

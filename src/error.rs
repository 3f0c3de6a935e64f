//! Error types for TrialDB.
//!
//! TrialDB uses a hierarchical error system:
//! - `TrialDBError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`, `NotFoundError`)
//!   provide detail
//!
//! No operation retries or swallows a store failure. A failed write aborts
//! the rest of the operation and surfaces here unchanged.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use trialdb::{TrialDB, Config, Result};
//!
//! async fn example() -> Result<()> {
//!     let db = TrialDB::open("./trials.db", Config::default())?;
//!     // ... operations that may fail ...
//!     db.close()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::relation::LinkState;
use crate::types::{ClinicalTestId, ExperimentId};

/// Result type alias for TrialDB operations.
pub type Result<T> = std::result::Result<T, TrialDBError>;

/// Top-level error enum for all TrialDB operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum TrialDBError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error, or the store could not be opened.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested document not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// A link is recorded on one side only.
    ///
    /// This is the window left behind when an associate or disassociate
    /// failed between its two writes. It is recoverable: re-running the
    /// same operation converges both sides.
    #[error("Link between experiment {experiment_id} and clinical test {clinical_test_id} is one-sided ({state:?}); re-run the operation to repair")]
    InvariantGap {
        /// Experiment side of the pair.
        experiment_id: ExperimentId,
        /// Clinical test side of the pair.
        clinical_test_id: ClinicalTestId,
        /// Which side holds the reference.
        state: LinkState,
    },

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrialDBError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this reports a one-sided link.
    pub fn is_invariant_gap(&self) -> bool {
        matches!(self, Self::InvariantGap { .. })
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying document store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),

    /// Error reported by an external store adapter.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}

// Also allow direct conversion to TrialDBError for convenience
impl From<redb::Error> for TrialDBError {
    fn from(err: redb::Error) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for TrialDBError {
    fn from(err: redb::DatabaseError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for TrialDBError {
    fn from(err: redb::TransactionError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for TrialDBError {
    fn from(err: redb::CommitError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for TrialDBError {
    fn from(err: redb::TableError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for TrialDBError {
    fn from(err: redb::StorageError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for TrialDBError {
    fn from(err: bincode::Error) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

impl From<tokio::task::JoinError> for TrialDBError {
    fn from(err: tokio::task::JoinError) -> Self {
        TrialDBError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A required field is missing or blank.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// A text field exceeds its maximum length.
    #[error("Field '{field}' too long: {len} bytes (max: {max} bytes)")]
    FieldTooLong {
        /// Name of the field.
        field: String,
        /// Actual length in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates a field too long error.
    pub fn field_too_long(field: impl Into<String>, len: usize, max: usize) -> Self {
        Self::FieldTooLong {
            field: field.into(),
            len,
            max,
        }
    }
}

/// Not found errors for specific document kinds.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Experiment with given ID not found.
    #[error("Experiment not found: {0}")]
    Experiment(String),

    /// Clinical test with given ID not found.
    #[error("Clinical test not found: {0}")]
    ClinicalTest(String),
}

impl NotFoundError {
    /// Creates an experiment not found error.
    pub fn experiment(id: impl ToString) -> Self {
        Self::Experiment(id.to_string())
    }

    /// Creates a clinical test not found error.
    pub fn clinical_test(id: impl ToString) -> Self {
        Self::ClinicalTest(id.to_string())
    }
}

//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine.
//! All table definitions are compile-time constants to ensure consistency.
//!
//! # Schema Versioning
//!
//! The schema version is stored in the metadata table. When opening an
//! existing database, we check the version and fail if it doesn't match.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str                                                  │
//! │   Value: &[u8] (bincode)                                     │
//! │   Entries: "db_metadata" -> DatabaseMetadata                 │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ EXPERIMENTS_TABLE                                            │
//! │   Key: &[u8; 16] (ExperimentId as UUID bytes)               │
//! │   Value: &[u8] (bincode-serialized Experiment)              │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ CLINICAL_TESTS_TABLE                                         │
//! │   Key: &[u8; 16] (ClinicalTestId as UUID bytes)             │
//! │   Value: &[u8] (bincode-serialized ClinicalTest)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no reverse-reference table: each document carries
//! its own id set and nothing else indexes the relation.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length in bytes of any single text field.
pub const MAX_TEXT_FIELD_LENGTH: usize = 512;

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Experiments table.
///
/// Key: ExperimentId as 16-byte UUID
/// Value: bincode-serialized Experiment struct
pub const EXPERIMENTS_TABLE: TableDefinition<&[u8; 16], &[u8]> =
    TableDefinition::new("experiments");

/// Clinical tests table.
///
/// Key: ClinicalTestId as 16-byte UUID
/// Value: bincode-serialized ClinicalTest struct
pub const CLINICAL_TESTS_TABLE: TableDefinition<&[u8; 16], &[u8]> =
    TableDefinition::new("clinical_tests");

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata stored in the metadata table.
///
/// This is serialized with bincode and stored under the key "db_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

impl Default for DatabaseMetadata {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration types for TrialDB.
//!
//! The [`Config`] struct controls database behavior including:
//! - Durability of each document write
//! - The full-scan size above which reverse lookups are reported
//!
//! # Example
//! ```rust
//! use trialdb::{Config, SyncMode};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Customize for a bulk import
//! let config = Config {
//!     sync_mode: SyncMode::Fast,
//!     full_scan_warn_threshold: 50_000,
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default number of experiments a reverse-lookup scan may visit before
/// a warning is logged.
pub const DEFAULT_FULL_SCAN_WARN_THRESHOLD: usize = 10_000;

/// Database configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use trialdb::Config;
///
/// let config = Config {
///     full_scan_warn_threshold: 1_000,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Durability mode for write operations.
    pub sync_mode: SyncMode,

    /// Number of experiments a clinical-test cascade may scan before
    /// logging a warning.
    ///
    /// Deleting a clinical test has no reverse index to consult, so it
    /// reads every experiment. The scan still runs past this bound; the
    /// warning makes the O(n) cost visible at scale.
    /// Default: 10,000
    pub full_scan_warn_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Normal,
            full_scan_warn_threshold: DEFAULT_FULL_SCAN_WARN_THRESHOLD,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// Called automatically when a [`TrialDB`](crate::TrialDB) is opened.
    ///
    /// # Errors
    /// Returns `ValidationError` if `full_scan_warn_threshold` is 0.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_scan_warn_threshold == 0 {
            return Err(ValidationError::invalid_field(
                "full_scan_warn_threshold",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Durability mode for write operations.
///
/// Controls the trade-off between write performance and crash safety.
/// Every document write is its own transaction, so this applies per
/// document, never across the two sides of a link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on transaction commit.
    #[default]
    Normal,

    /// Async sync (faster writes, may lose recent data on crash).
    Fast,

    /// Two-phase commit on every write (slowest, maximum durability).
    Paranoid,
}

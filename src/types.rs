//! Core type definitions for TrialDB identifiers and timestamps.
//!
//! Both document kinds use UUID v7 identifiers, generated on the client
//! when a document is first built, so ids are time-ordered and never
//! reassigned by the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Experiment identifier (UUID v7 for time-ordering).
///
/// # Example
/// ```
/// use trialdb::ExperimentId;
///
/// let id = ExperimentId::new();
/// println!("Created experiment: {}", id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExperimentId(pub Uuid);

impl ExperimentId {
    /// Creates a new ExperimentId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) ExperimentId.
    /// Useful for testing or sentinel values.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates an ExperimentId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ExperimentId {
    /// Returns a nil (all zeros) ExperimentId.
    ///
    /// For a new unique ID, use [`ExperimentId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clinical test identifier (UUID v7 for time-ordering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClinicalTestId(pub Uuid);

impl ClinicalTestId {
    /// Creates a new ClinicalTestId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) ClinicalTestId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a ClinicalTestId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ClinicalTestId {
    /// Returns a nil (all zeros) ClinicalTestId.
    ///
    /// For a new unique ID, use [`ClinicalTestId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for ClinicalTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch, returns a timestamp
    /// of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_id_roundtrip_bytes() {
        let id = ExperimentId::new();
        let restored = ExperimentId::from_bytes(*id.as_bytes());
        assert_eq!(id, restored);
    }

    #[test]
    fn test_new_ids_are_unique() {
        let first = ClinicalTestId::new();
        let second = ClinicalTestId::new();
        assert_ne!(first, second);
    }

    #[test]
    fn test_default_ids_are_nil() {
        assert_eq!(ExperimentId::default(), ExperimentId::nil());
        assert_eq!(ClinicalTestId::default(), ClinicalTestId::nil());
        assert_ne!(ExperimentId::new(), ExperimentId::nil());
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(2000);
        assert!(t1 < t2);
        assert_eq!(t1.as_millis(), 1000);
    }

    #[test]
    fn test_id_display_is_uuid() {
        let id = ClinicalTestId::nil();
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_id_bincode_roundtrip() {
        let id = ExperimentId::new();
        let bytes = bincode::serialize(&id).unwrap();
        let restored: ExperimentId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(id, restored);
    }
}

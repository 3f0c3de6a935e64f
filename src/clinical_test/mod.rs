//! Clinical test documents.
//!
//! A **clinical test** exists only while at least one experiment links to
//! it. It is created attached to an experiment and is deleted when its
//! last link is removed.
//!
//! # Operations
//!
//! Available on [`TrialDB`](crate::TrialDB):
//!
//! - [`add_clinical_test(experiment_id, new)`](crate::TrialDB::add_clinical_test)
//! - [`get_clinical_test(id)`](crate::TrialDB::get_clinical_test)
//! - [`list_clinical_tests(experiment_id, term)`](crate::TrialDB::list_clinical_tests)
//! - [`delete_clinical_test(id)`](crate::TrialDB::delete_clinical_test)

pub mod types;

pub use types::{ClinicalTest, NewClinicalTest};

use crate::error::{TrialDBError, ValidationError};
use crate::storage::schema::MAX_TEXT_FIELD_LENGTH;

/// Validates a new clinical test before it is linked and stored.
pub(crate) fn validate_new_clinical_test(ct: &NewClinicalTest) -> Result<(), TrialDBError> {
    if ct.name.trim().is_empty() {
        return Err(ValidationError::required_field("name").into());
    }

    if ct.name.len() > MAX_TEXT_FIELD_LENGTH {
        return Err(
            ValidationError::field_too_long("name", ct.name.len(), MAX_TEXT_FIELD_LENGTH).into(),
        );
    }

    if ct.description.len() > MAX_TEXT_FIELD_LENGTH {
        return Err(ValidationError::field_too_long(
            "description",
            ct.description.len(),
            MAX_TEXT_FIELD_LENGTH,
        )
        .into());
    }

    Ok(())
}

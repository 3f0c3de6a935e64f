//! Experiment documents.
//!
//! An **experiment** is the document kind users search for and own. It
//! holds the forward side of the experiment/clinical-test relation.
//!
//! # Operations
//!
//! Available on [`TrialDB`](crate::TrialDB):
//!
//! - [`create_experiment(new)`](crate::TrialDB::create_experiment)
//! - [`get_experiment(id)`](crate::TrialDB::get_experiment)
//! - [`search_experiments(term)`](crate::TrialDB::search_experiments)
//! - [`delete_experiment(id)`](crate::TrialDB::delete_experiment) (cascades)
//!
//! # Constraints
//!
//! - `experiment_number` and `title` must be non-blank
//! - Each text field is at most [`MAX_TEXT_FIELD_LENGTH`] bytes

pub mod types;

pub use types::{Experiment, NewExperiment};

use crate::error::{TrialDBError, ValidationError};
use crate::storage::schema::MAX_TEXT_FIELD_LENGTH;

/// Validates a new experiment before storage.
pub(crate) fn validate_new_experiment(exp: &NewExperiment) -> Result<(), TrialDBError> {
    if exp.experiment_number.trim().is_empty() {
        return Err(ValidationError::required_field("experiment_number").into());
    }
    if exp.title.trim().is_empty() {
        return Err(ValidationError::required_field("title").into());
    }

    for (field, value) in [
        ("experiment_number", &exp.experiment_number),
        ("title", &exp.title),
        ("author", &exp.author),
    ] {
        if value.len() > MAX_TEXT_FIELD_LENGTH {
            return Err(
                ValidationError::field_too_long(field, value.len(), MAX_TEXT_FIELD_LENGTH).into(),
            );
        }
    }

    Ok(())
}

//! Job parameters, states, outcomes and errors.

mod error;
mod types;

pub use error::JobError;
pub use types::{
    Detail, FeatureSensitivity, JobId, JobOutcome, JobParameters, JobState, ParseEnumError,
    SampleOrdering,
};

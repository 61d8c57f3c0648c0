//! Error types for the timeseries crate.

use chrono::NaiveDateTime;
use thiserror::Error;

use rain_common::SyncError;

/// Errors that can occur while resampling a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResampleError {
    #[error("Timestamps not strictly increasing: {next} follows {previous}")]
    NotIncreasing {
        previous: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("Resampling step must be positive, got {0} minutes")]
    InvalidStep(i64),
}

/// Result type for timeseries operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

impl From<ResampleError> for SyncError {
    fn from(err: ResampleError) -> Self {
        SyncError::Resample(err.to_string())
    }
}

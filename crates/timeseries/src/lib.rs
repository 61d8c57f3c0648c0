//! Rainfall timeseries alignment.
//!
//! Pure, I/O-free building blocks used by the sync driver:
//!
//! - [`Resampler`]: step-hold resampling onto the canonical 5-minute grid
//! - [`MultiSourceAggregator`]: per-timestamp averaging across upstream models
//! - [`sanitize`]: missing-value handling for raw upstream readings

mod aggregate;
pub mod error;
mod resample;
pub mod sanitize;

pub use aggregate::{aggregate, MultiSourceAggregator};
pub use error::{ResampleError, Result};
pub use resample::Resampler;

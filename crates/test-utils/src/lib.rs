//! Shared test utilities for the rainfall sync workspace.
//!
//! This crate provides common testing infrastructure including:
//! - In-memory implementations of every store trait
//! - Timestamp and series generators
//! - Common grid/station fixtures
//! - Path and temp-file helpers for loader tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod memory;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use memory::{
    MemoryForecastStore, MemoryObservationStore, MemoryReferenceStore, MemorySimulationStore,
};
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that a series holds exactly the given `(minute offset, value)`
/// pairs relative to `start`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::{assert_series, at};
///
/// assert_series!(out, at(0, 0), [(5, 5.0), (10, 5.0), (15, 10.0)]);
/// ```
#[macro_export]
macro_rules! assert_series {
    ($series:expr, $start:expr, [$(($offset:expr, $value:expr)),* $(,)?]) => {{
        let expected: Vec<(i64, f64)> = vec![$(($offset as i64, $value as f64)),*];
        let actual: Vec<(i64, f64)> = $series
            .iter()
            .map(|p| ((p.timestamp - $start).num_minutes(), p.value))
            .collect();
        assert_eq!(actual, expected);
    }};
}

//! Common types and utilities shared across the rainfall sync workspace.

pub mod error;
pub mod grid;
pub mod method;
pub mod station;
pub mod time;

pub use error::{SyncError, SyncResult};
pub use grid::{GridCellId, GridCellMetadata, GridIdPattern, GridInterpolation, ModelFamily};
pub use method::ValueMethod;
pub use station::{SourceStations, StationId};
pub use time::{TimePoint, TimeseriesId, CANONICAL_STEP_MINUTES, MISSING_SENTINEL};

//! Incremental rainfall timeseries synchronization.
//!
//! Per grid cell the driver walks `Unmapped -> Registered -> Cursored ->
//! Synced`: resolve the upstream stations, get or create the timeseries
//! record, read its `obs_end` cursor, then fetch only the delta from every
//! source, resample it onto the 5-minute grid, average across sources and
//! persist it while advancing the cursor.
//!
//! Each cell is its own unit of work: a failure is recorded in the run
//! summary and the loop continues with the next cell.

pub mod driver;
pub mod geometry;
pub mod outcome;
pub mod registry;
pub mod resolver;
pub mod source;

pub use driver::IncrementalSyncDriver;
pub use outcome::{CellOutcome, SkipReason, SyncSummary};
pub use registry::TimeseriesIdentifierRegistry;
pub use resolver::{GridMapping, GridMappingResolver, MappingKind};
pub use source::{ForecastSource, ObservationSource, SeriesSource};

//! Store seams used by the sync engine.
//!
//! Each trait has a PostgreSQL implementation in this crate and an
//! in-memory implementation in `test-utils`.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use rain_common::{
    GridCellId, GridCellMetadata, GridIdPattern, StationId, SyncResult, TimePoint, TimeseriesId,
    ValueMethod,
};

/// One row of the `grid_map` reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMapRecord {
    pub grid_id: GridCellId,
    /// Observation station slots `obs1..obs3`
    pub obs: [Option<StationId>; 3],
    /// Forecast station
    pub fcst: Option<StationId>,
}

/// Grid to station mapping tables. Read-only to the sync engine.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// All mapping rows whose grid id matches `pattern`.
    async fn grid_mappings(&self, pattern: &GridIdPattern) -> SyncResult<Vec<GridMapRecord>>;

    /// Insert rows, overwriting the station columns of existing grid ids.
    async fn upsert_grid_mappings(&self, records: &[GridMapRecord]) -> SyncResult<u64>;
}

/// Timeseries registry, cursors and canonical 5-minute data.
#[async_trait]
pub trait SimulationStore: Send + Sync {
    async fn find_timeseries_id(
        &self,
        grid_id: &GridCellId,
        method: ValueMethod,
    ) -> SyncResult<Option<TimeseriesId>>;

    /// Insert a run row for `meta` under `id`, or return the id of the row
    /// that already exists for `(grid_id, method)`.
    ///
    /// `Ok(None)` means the insert lost a race and the competing row was not
    /// yet visible; callers re-fetch.
    async fn insert_run_or_fetch(
        &self,
        id: &TimeseriesId,
        meta: &GridCellMetadata,
    ) -> SyncResult<Option<TimeseriesId>>;

    async fn obs_end(&self, id: &TimeseriesId) -> SyncResult<Option<NaiveDateTime>>;

    /// Move the cursor forward to `end`. Never moves it backward; returns
    /// whether the stored cursor changed.
    async fn advance_obs_end(&self, id: &TimeseriesId, end: NaiveDateTime) -> SyncResult<bool>;

    /// Insert points, overwriting values at existing `(id, time)` keys.
    async fn upsert_points(&self, id: &TimeseriesId, points: &[TimePoint]) -> SyncResult<u64>;

    /// Persist a batch and advance the cursor to its latest timestamp.
    ///
    /// Returns the new cursor, or `None` for an empty batch.
    async fn persist_batch(
        &self,
        id: &TimeseriesId,
        points: &[TimePoint],
    ) -> SyncResult<Option<NaiveDateTime>> {
        let Some(end) = points.iter().map(|p| p.timestamp).max() else {
            return Ok(None);
        };
        self.upsert_points(id, points).await?;
        self.advance_obs_end(id, end).await?;
        Ok(Some(end))
    }
}

/// Which forecast series to read for a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSelector {
    pub source_id: i32,
    pub sim_tag: String,
    pub variable_id: i32,
    pub unit_id: i32,
}

/// Per-model forecast runs.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Resolve a `(model, version)` pair to its source id.
    async fn source_id(&self, model: &str, version: &str) -> SyncResult<Option<i32>>;

    /// Series of the most recent run for `station`, optionally limited to
    /// timestamps at or after `since`, ordered by time.
    async fn latest_series(
        &self,
        selector: &ForecastSelector,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>>;
}

/// Raw observation readings keyed by station hash id.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Readings at or after `since`, ordered by time.
    async fn series_since(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>>;
}

//! Get-or-create registry of timeseries identifiers and their cursors.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use rain_common::{
    GridCellId, GridCellMetadata, SyncError, SyncResult, TimePoint, TimeseriesId, ValueMethod,
};
use storage::SimulationStore;

/// Re-fetch attempts after an insert that lost a creation race.
const CREATE_ATTEMPTS: usize = 3;

/// Maps `(grid_id, method)` to a durable [`TimeseriesId`] and its cursor.
#[derive(Clone)]
pub struct TimeseriesIdentifierRegistry {
    store: Arc<dyn SimulationStore>,
}

impl TimeseriesIdentifierRegistry {
    pub fn new(store: Arc<dyn SimulationStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(
        &self,
        grid_id: &GridCellId,
        method: ValueMethod,
    ) -> SyncResult<Option<TimeseriesId>> {
        self.store.find_timeseries_id(grid_id, method).await
    }

    /// Return the identifier for `meta`, creating its record if absent.
    ///
    /// Creation is a single insert-or-fetch round trip. When a concurrent
    /// run wins the insert but its row is not yet visible, the row is
    /// re-fetched; the conflict never reaches the caller.
    pub async fn create_if_absent(&self, meta: &GridCellMetadata) -> SyncResult<TimeseriesId> {
        let candidate = TimeseriesId::derive(&meta.grid_id, meta.method);

        for attempt in 1..=CREATE_ATTEMPTS {
            if let Some(id) = self.store.insert_run_or_fetch(&candidate, meta).await? {
                return Ok(id);
            }
            debug!(
                grid_id = %meta.grid_id,
                method = %meta.method,
                attempt,
                "Lost create race, re-fetching"
            );
            if let Some(id) = self.lookup(&meta.grid_id, meta.method).await? {
                return Ok(id);
            }
        }

        Err(SyncError::DataAccess(format!(
            "timeseries for {} ({}) not visible after {} create attempts",
            meta.grid_id, meta.method, CREATE_ATTEMPTS
        )))
    }

    pub async fn get_cursor(&self, id: &TimeseriesId) -> SyncResult<Option<NaiveDateTime>> {
        self.store.obs_end(id).await
    }

    /// Move the cursor to `end` unless it is already at or past it.
    pub async fn advance_cursor(&self, id: &TimeseriesId, end: NaiveDateTime) -> SyncResult<bool> {
        self.store.advance_obs_end(id, end).await
    }

    /// Upsert `points` and advance the cursor to their latest timestamp.
    pub async fn persist(
        &self,
        id: &TimeseriesId,
        points: &[TimePoint],
    ) -> SyncResult<Option<NaiveDateTime>> {
        self.store.persist_batch(id, points).await
    }
}

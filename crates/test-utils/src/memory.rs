//! In-memory store implementations for driver and registry tests.
//!
//! Each store mirrors the semantics of its PostgreSQL counterpart closely
//! enough for the sync engine not to tell the difference, and exposes
//! knobs for injecting failures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use rain_common::{
    GridCellId, GridCellMetadata, GridIdPattern, StationId, SyncError, SyncResult, TimePoint,
    TimeseriesId, ValueMethod,
};
use storage::{ForecastSelector, ForecastStore, GridMapRecord, ObservationStore, ReferenceStore, SimulationStore};

fn unavailable(what: &str) -> SyncError {
    SyncError::DataAccess(format!("{} unavailable", what))
}

// ============================================================================
// Reference store
// ============================================================================

/// Grid map rows kept in insertion order.
#[derive(Default)]
pub struct MemoryReferenceStore {
    rows: Mutex<Vec<GridMapRecord>>,
    unavailable: Mutex<bool>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<GridMapRecord>) -> Self {
        Self {
            rows: Mutex::new(records),
            unavailable: Mutex::new(false),
        }
    }

    /// Make every subsequent query fail with a data-access error.
    pub fn set_unavailable(&self, value: bool) {
        *self.unavailable.lock().unwrap() = value;
    }

    pub fn records(&self) -> Vec<GridMapRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn grid_mappings(&self, pattern: &GridIdPattern) -> SyncResult<Vec<GridMapRecord>> {
        if *self.unavailable.lock().unwrap() {
            return Err(unavailable("reference store"));
        }
        let mut rows: Vec<GridMapRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| pattern.matches(r.grid_id.as_str()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.grid_id.cmp(&b.grid_id));
        Ok(rows)
    }

    async fn upsert_grid_mappings(&self, records: &[GridMapRecord]) -> SyncResult<u64> {
        if *self.unavailable.lock().unwrap() {
            return Err(unavailable("reference store"));
        }
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            match rows.iter_mut().find(|r| r.grid_id == record.grid_id) {
                Some(existing) => *existing = record.clone(),
                None => rows.push(record.clone()),
            }
        }
        Ok(records.len() as u64)
    }
}

// ============================================================================
// Simulation store
// ============================================================================

#[derive(Debug, Clone)]
struct RunRow {
    meta: GridCellMetadata,
    obs_end: Option<NaiveDateTime>,
}

#[derive(Default)]
struct SimulationState {
    runs: HashMap<TimeseriesId, RunRow>,
    by_cell: HashMap<(GridCellId, ValueMethod), TimeseriesId>,
    data: HashMap<TimeseriesId, BTreeMap<NaiveDateTime, f64>>,
    /// Remaining inserts that report a lost race after writing.
    lost_races: usize,
    /// Grid ids whose writes fail.
    failing_cells: HashSet<GridCellId>,
    insert_calls: usize,
}

/// Registry, cursors and data in one map per table.
#[derive(Default)]
pub struct MemorySimulationStore {
    state: Mutex<SimulationState>,
}

impl MemorySimulationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` inserts store their row but report `Ok(None)`, as a
    /// concurrent writer whose row is not yet visible would.
    pub fn lose_next_races(&self, count: usize) {
        self.state.lock().unwrap().lost_races = count;
    }

    /// Fail every data write for `grid_id`.
    pub fn fail_writes_for(&self, grid_id: &GridCellId) {
        self.state.lock().unwrap().failing_cells.insert(grid_id.clone());
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().unwrap().runs.len()
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn metadata(&self, id: &TimeseriesId) -> Option<GridCellMetadata> {
        self.state.lock().unwrap().runs.get(id).map(|r| r.meta.clone())
    }

    /// Stored points for `id`, ordered by time.
    pub fn points(&self, id: &TimeseriesId) -> Vec<TimePoint> {
        self.state
            .lock()
            .unwrap()
            .data
            .get(id)
            .map(|rows| rows.iter().map(|(t, v)| TimePoint::new(*t, *v)).collect())
            .unwrap_or_default()
    }

    /// Seed a run row directly, bypassing the insert path.
    pub fn seed_run(&self, id: TimeseriesId, meta: GridCellMetadata, obs_end: Option<NaiveDateTime>) {
        let mut state = self.state.lock().unwrap();
        state
            .by_cell
            .insert((meta.grid_id.clone(), meta.method), id.clone());
        state.runs.insert(id, RunRow { meta, obs_end });
    }

    fn check_writable(state: &SimulationState, id: &TimeseriesId) -> SyncResult<()> {
        match state.runs.get(id) {
            None => Err(SyncError::DataAccess(format!("unknown timeseries {}", id))),
            Some(run) if state.failing_cells.contains(&run.meta.grid_id) => {
                Err(unavailable("simulation store"))
            }
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl SimulationStore for MemorySimulationStore {
    async fn find_timeseries_id(
        &self,
        grid_id: &GridCellId,
        method: ValueMethod,
    ) -> SyncResult<Option<TimeseriesId>> {
        let state = self.state.lock().unwrap();
        Ok(state.by_cell.get(&(grid_id.clone(), method)).cloned())
    }

    async fn insert_run_or_fetch(
        &self,
        id: &TimeseriesId,
        meta: &GridCellMetadata,
    ) -> SyncResult<Option<TimeseriesId>> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        let key = (meta.grid_id.clone(), meta.method);
        if let Some(existing) = state.by_cell.get(&key) {
            return Ok(Some(existing.clone()));
        }

        state.by_cell.insert(key, id.clone());
        state.runs.insert(
            id.clone(),
            RunRow {
                meta: meta.clone(),
                obs_end: None,
            },
        );

        if state.lost_races > 0 {
            state.lost_races -= 1;
            return Ok(None);
        }
        Ok(Some(id.clone()))
    }

    async fn obs_end(&self, id: &TimeseriesId) -> SyncResult<Option<NaiveDateTime>> {
        let state = self.state.lock().unwrap();
        Ok(state.runs.get(id).and_then(|r| r.obs_end))
    }

    async fn advance_obs_end(&self, id: &TimeseriesId, end: NaiveDateTime) -> SyncResult<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(run) = state.runs.get_mut(id) else {
            return Ok(false);
        };
        match run.obs_end {
            Some(current) if current >= end => Ok(false),
            _ => {
                run.obs_end = Some(end);
                Ok(true)
            }
        }
    }

    async fn upsert_points(&self, id: &TimeseriesId, points: &[TimePoint]) -> SyncResult<u64> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state, id)?;
        let rows = state.data.entry(id.clone()).or_default();
        for point in points {
            rows.insert(point.timestamp, point.value);
        }
        Ok(points.len() as u64)
    }
}

// ============================================================================
// Forecast store
// ============================================================================

#[derive(Default)]
struct ForecastState {
    sources: HashMap<(String, String), i32>,
    series: HashMap<(i32, StationId), Vec<TimePoint>>,
    failing: HashSet<StationId>,
}

/// Latest-run forecast series keyed by `(source_id, station)`.
#[derive(Default)]
pub struct MemoryForecastStore {
    state: Mutex<ForecastState>,
}

impl MemoryForecastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&self, model: &str, version: &str, source_id: i32) {
        self.state
            .lock()
            .unwrap()
            .sources
            .insert((model.to_string(), version.to_string()), source_id);
    }

    /// Replace the latest-run series of `station` under `source_id`.
    pub fn set_series(&self, source_id: i32, station: &StationId, points: Vec<TimePoint>) {
        self.state
            .lock()
            .unwrap()
            .series
            .insert((source_id, station.clone()), points);
    }

    pub fn fail_station(&self, station: &StationId) {
        self.state.lock().unwrap().failing.insert(station.clone());
    }
}

#[async_trait]
impl ForecastStore for MemoryForecastStore {
    async fn source_id(&self, model: &str, version: &str) -> SyncResult<Option<i32>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sources
            .get(&(model.to_string(), version.to_string()))
            .copied())
    }

    async fn latest_series(
        &self,
        selector: &ForecastSelector,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(station) {
            return Err(unavailable("forecast store"));
        }
        Ok(filter_since(
            state.series.get(&(selector.source_id, station.clone())),
            since,
        ))
    }
}

// ============================================================================
// Observation store
// ============================================================================

#[derive(Default)]
struct ObservationState {
    series: HashMap<StationId, Vec<TimePoint>>,
    failing: HashSet<StationId>,
}

/// Observation readings keyed by station.
#[derive(Default)]
pub struct MemoryObservationStore {
    state: Mutex<ObservationState>,
}

impl MemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_series(&self, station: &StationId, points: Vec<TimePoint>) {
        self.state
            .lock()
            .unwrap()
            .series
            .insert(station.clone(), points);
    }

    pub fn fail_station(&self, station: &StationId) {
        self.state.lock().unwrap().failing.insert(station.clone());
    }
}

#[async_trait]
impl ObservationStore for MemoryObservationStore {
    async fn series_since(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(station) {
            return Err(unavailable("observation store"));
        }
        Ok(filter_since(state.series.get(station), since))
    }
}

fn filter_since(series: Option<&Vec<TimePoint>>, since: Option<NaiveDateTime>) -> Vec<TimePoint> {
    let mut points: Vec<TimePoint> = series
        .map(|s| {
            s.iter()
                .filter(|p| since.map_or(true, |t| p.timestamp >= t))
                .copied()
                .collect()
        })
        .unwrap_or_default();
    points.sort_by_key(|p| p.timestamp);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{at, mdpa_pattern, sample_metadata, series};

    #[tokio::test]
    async fn test_insert_then_fetch_existing() {
        let store = MemorySimulationStore::new();
        let meta = sample_metadata(1, ValueMethod::MultiModelEnsemble);
        let id = TimeseriesId::derive(&meta.grid_id, meta.method);

        let first = store.insert_run_or_fetch(&id, &meta).await.unwrap();
        let other = TimeseriesId::from_stored("other");
        let second = store.insert_run_or_fetch(&other, &meta).await.unwrap();

        assert_eq!(first, Some(id.clone()));
        assert_eq!(second, Some(id));
        assert_eq!(store.run_count(), 1);
    }

    #[tokio::test]
    async fn test_lost_race_still_stores_row() {
        let store = MemorySimulationStore::new();
        store.lose_next_races(1);
        let meta = sample_metadata(1, ValueMethod::MultiModelEnsemble);
        let id = TimeseriesId::derive(&meta.grid_id, meta.method);

        assert_eq!(store.insert_run_or_fetch(&id, &meta).await.unwrap(), None);
        assert_eq!(
            store.find_timeseries_id(&meta.grid_id, meta.method).await.unwrap(),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_cursor_never_moves_backward() {
        let store = MemorySimulationStore::new();
        let meta = sample_metadata(1, ValueMethod::Observation);
        let id = TimeseriesId::derive(&meta.grid_id, meta.method);
        store.insert_run_or_fetch(&id, &meta).await.unwrap();

        assert!(store.advance_obs_end(&id, at(6, 0)).await.unwrap());
        assert!(!store.advance_obs_end(&id, at(5, 0)).await.unwrap());
        assert_eq!(store.obs_end(&id).await.unwrap(), Some(at(6, 0)));
    }

    #[tokio::test]
    async fn test_observation_since_is_inclusive() {
        let store = MemoryObservationStore::new();
        let station = StationId::new("100066");
        store.set_series(&station, series(at(0, 0), 5, &[1.0, 2.0, 3.0]));

        let points = store.series_since(&station, Some(at(0, 5))).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, at(0, 5));
    }

    #[tokio::test]
    async fn test_reference_filters_by_pattern() {
        let store = MemoryReferenceStore::new();
        store
            .upsert_grid_mappings(&[
                GridMapRecord {
                    grid_id: GridCellId::from_stored("flo2d_250_1_MDPA"),
                    obs: [None, None, None],
                    fcst: Some(StationId::new("1043")),
                },
                GridMapRecord {
                    grid_id: GridCellId::from_stored("flo2d_150_1_MDPA"),
                    obs: [None, None, None],
                    fcst: Some(StationId::new("1044")),
                },
            ])
            .await
            .unwrap();

        let rows = store.grid_mappings(&mdpa_pattern()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].grid_id.as_str(), "flo2d_250_1_MDPA");
    }
}

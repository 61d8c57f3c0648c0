//! Per-cell incremental sync loop.

use std::sync::Arc;

use chrono::NaiveDateTime;
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use rain_common::time::lookback_start;
use rain_common::{GridCellMetadata, SourceStations, SyncResult, TimePoint};
use timeseries::sanitize::{drop_non_finite, replace_missing};
use timeseries::{MultiSourceAggregator, Resampler};

use crate::outcome::{CellOutcome, SkipReason, SyncSummary};
use crate::registry::TimeseriesIdentifierRegistry;
use crate::resolver::GridMapping;
use crate::source::SeriesSource;

/// Start of the fetch window for cells that were never synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialWindow {
    /// Fetch everything upstream holds
    FullHistory,
    /// Fetch from `now - hours`, truncated to the hour
    Lookback { now: NaiveDateTime, hours: u32 },
}

impl InitialWindow {
    fn start(&self) -> Option<NaiveDateTime> {
        match *self {
            InitialWindow::FullHistory => None,
            InitialWindow::Lookback { now, hours } => Some(lookback_start(now, hours)),
        }
    }
}

/// Syncs grid cells one at a time from a fixed set of upstream sources.
pub struct IncrementalSyncDriver {
    registry: TimeseriesIdentifierRegistry,
    sources: Vec<Arc<dyn SeriesSource>>,
    resampler: Resampler,
    initial_window: InitialWindow,
}

impl IncrementalSyncDriver {
    pub fn new(registry: TimeseriesIdentifierRegistry, sources: Vec<Arc<dyn SeriesSource>>) -> Self {
        Self {
            registry,
            sources,
            resampler: Resampler::default(),
            initial_window: InitialWindow::FullHistory,
        }
    }

    pub fn with_initial_window(mut self, window: InitialWindow) -> Self {
        self.initial_window = window;
        self
    }

    /// Sync every cell in order. A failing cell is recorded and the loop
    /// moves on.
    #[instrument(skip_all, fields(cells = cells.len(), sources = self.sources.len()))]
    pub async fn run(&self, cells: &[GridCellMetadata], mapping: &GridMapping) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for meta in cells {
            let outcome = match self.sync_cell(meta, mapping).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cell_local() => {
                    warn!(grid_id = %meta.grid_id, error = %e, "Cell skipped");
                    CellOutcome::Skipped(SkipReason::Unaligned(e.to_string()))
                }
                Err(e) => {
                    error!(grid_id = %meta.grid_id, error = %e, "Cell sync failed");
                    CellOutcome::Failed(e.to_string())
                }
            };

            counter!("rainsync_cells_total", "outcome" => outcome.label()).increment(1);
            summary.record(&meta.grid_id, &outcome);
        }

        info!(
            synced = summary.synced,
            up_to_date = summary.up_to_date,
            skipped = summary.skipped,
            failed = summary.failed,
            points = summary.points_persisted,
            "Sync pass complete"
        );
        summary
    }

    /// Sync one cell: resolve, register, read the cursor, then fetch the
    /// delta, align it and persist it.
    #[instrument(skip_all, fields(grid_id = %meta.grid_id, method = %meta.method))]
    pub async fn sync_cell(
        &self,
        meta: &GridCellMetadata,
        mapping: &GridMapping,
    ) -> SyncResult<CellOutcome> {
        // Unmapped -> Registered
        let Some(stations) = mapping.get(&meta.grid_id) else {
            info!("No upstream station mapped, skipping");
            return Ok(CellOutcome::Skipped(SkipReason::Unmapped));
        };

        // Registered -> Cursored
        let tms_id = self.registry.create_if_absent(meta).await?;
        let cursor = self.registry.get_cursor(&tms_id).await?;
        let since = cursor.or_else(|| self.initial_window.start());
        debug!(tms_id = %tms_id, cursor = ?cursor, since = ?since, "Read cursor");

        // Cursored -> Synced
        let aligned = self.collect(stations, since).await?;
        let Some(end) = aligned.iter().map(|p| p.timestamp).max() else {
            info!(tms_id = %tms_id, "No new upstream data");
            return Ok(CellOutcome::UpToDate);
        };

        let points = aligned.len();
        self.registry.persist(&tms_id, &aligned).await?;
        counter!("rainsync_points_persisted_total").increment(points as u64);

        info!(tms_id = %tms_id, points, cursor = %end, "Synced cell");
        Ok(CellOutcome::Synced {
            points,
            cursor: end,
        })
    }

    /// Fetch, resample and average every `(source, station)` series.
    async fn collect(
        &self,
        stations: &SourceStations,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        let mut aggregator = MultiSourceAggregator::new();

        for source in &self.sources {
            for station in stations.stations() {
                let mut raw = source.fetch(station, since).await?;
                let dropped = drop_non_finite(&mut raw);
                let mut resampled = self.resampler.resample(&raw, since)?;
                let replaced = replace_missing(&mut resampled);

                debug!(
                    source = source.name(),
                    station = %station,
                    raw = raw.len(),
                    resampled = resampled.len(),
                    dropped,
                    replaced,
                    "Aligned upstream series"
                );
                aggregator.push_series(&resampled);
            }
        }

        Ok(aggregator.finish())
    }
}

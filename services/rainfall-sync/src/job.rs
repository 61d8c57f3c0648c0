//! Wiring of one configured job into a sync driver run.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use rain_common::{GridIdPattern, ModelFamily, SyncError, SyncResult};
use storage::{ForecastStore, ObservationStore, ReferenceStore, SimulationStore};
use sync::driver::InitialWindow;
use sync::geometry::{load_grid_cells, load_station_cells};
use sync::{
    ForecastSource, GridMappingResolver, IncrementalSyncDriver, ObservationSource, SeriesSource,
    SyncSummary, TimeseriesIdentifierRegistry,
};

use crate::config::{resolve_path, CellsConfig, JobConfig, SourceConfig};

/// Store handles shared by every job of a run.
///
/// Forecast and observation stores are only opened when some job needs
/// them.
#[derive(Clone)]
pub struct Stores {
    pub reference: Arc<dyn ReferenceStore>,
    pub simulation: Arc<dyn SimulationStore>,
    pub forecast: Option<Arc<dyn ForecastStore>>,
    pub observation: Option<Arc<dyn ObservationStore>>,
}

/// Run one job to completion.
///
/// Errors returned here concern the whole job (unreadable cell input, no
/// mapping rows, unknown forecast source, missing store); per-cell failures
/// are recorded in the returned summary instead.
#[instrument(skip_all, fields(job = %job.job.id))]
pub async fn run_job(
    job: &JobConfig,
    config_dir: &Path,
    stores: &Stores,
    now: NaiveDateTime,
) -> SyncResult<SyncSummary> {
    let target = &job.target;

    let (cells, mapping) = match &job.cells {
        CellsConfig::Stations { path } => load_station_cells(
            &resolve_path(config_dir, path),
            &target.grid_interpolation,
            target.method,
            &target.model,
        )?,
        CellsConfig::Geometry { path } => {
            let family = geometry_family(job)?;
            let cells = load_grid_cells(
                &resolve_path(config_dir, path),
                family,
                &target.grid_interpolation,
                target.method,
                &target.model,
            )?;
            let resolver = GridMappingResolver::new(stores.reference.clone());
            let mapping = resolver
                .resolve(&target.grid_interpolation, family, job.mapping_kind())
                .await?
                .ok_or_else(|| {
                    let pattern = GridIdPattern::new(family.clone(), target.grid_interpolation.clone());
                    SyncError::MappingNotFound(pattern.to_like())
                })?;
            (cells, mapping)
        }
    };

    let registry = TimeseriesIdentifierRegistry::new(stores.simulation.clone());
    let driver = match &job.source {
        SourceConfig::Forecast(fcst) => {
            let store = stores
                .forecast
                .clone()
                .ok_or_else(|| SyncError::InvalidConfig("forecast store not configured".into()))?;

            let mut sources: Vec<Arc<dyn SeriesSource>> = Vec::with_capacity(fcst.models.len());
            for model_ref in &fcst.models {
                let source = ForecastSource::resolve(
                    store.clone(),
                    &model_ref.model,
                    &model_ref.version,
                    &fcst.sim_tag,
                    fcst.variable_id,
                    fcst.unit_id,
                )
                .await?;
                sources.push(Arc::new(source));
            }
            IncrementalSyncDriver::new(registry, sources)
        }
        SourceConfig::Observation(obs) => {
            let store = stores
                .observation
                .clone()
                .ok_or_else(|| SyncError::InvalidConfig("observation store not configured".into()))?;

            let sources: Vec<Arc<dyn SeriesSource>> = vec![Arc::new(ObservationSource::new(store))];
            IncrementalSyncDriver::new(registry, sources).with_initial_window(InitialWindow::Lookback {
                now,
                hours: obs.lookback_hours,
            })
        }
    };

    info!(cells = cells.len(), mapped = mapping.len(), "Starting job");
    Ok(driver.run(&cells, &mapping).await)
}

fn geometry_family(job: &JobConfig) -> SyncResult<&ModelFamily> {
    job.target
        .model_family
        .as_ref()
        .ok_or_else(|| SyncError::InvalidConfig("geometry cells need target.model_family".into()))
}

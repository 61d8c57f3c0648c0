//! Grid cell to upstream station resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use rain_common::{
    GridCellId, GridIdPattern, GridInterpolation, ModelFamily, SourceStations, SyncResult,
};
use storage::{GridMapRecord, ReferenceStore};

/// Upstream stations for every resolvable cell of one model grid.
pub type GridMapping = HashMap<GridCellId, SourceStations>;

/// Which station columns of the mapping table feed the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// The single `fcst` column
    Forecast,
    /// The `obs1..obs3` columns
    Observation,
}

/// Resolves grid cells to the station ids that feed them.
pub struct GridMappingResolver {
    store: Arc<dyn ReferenceStore>,
}

impl GridMappingResolver {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Mapping for every `"{family}_*_{interpolation}"` cell.
    ///
    /// Returns `None` when no row matches the pattern. Rows whose station
    /// columns for `kind` are all blank are left out, so those cells stay
    /// unresolved.
    pub async fn resolve(
        &self,
        interpolation: &GridInterpolation,
        family: &ModelFamily,
        kind: MappingKind,
    ) -> SyncResult<Option<GridMapping>> {
        let pattern = GridIdPattern::new(family.clone(), interpolation.clone());
        let rows = self.store.grid_mappings(&pattern).await?;
        if rows.is_empty() {
            info!(pattern = %pattern.to_like(), "No grid mapping rows matched");
            return Ok(None);
        }

        let total = rows.len();
        let mapping: GridMapping = rows
            .into_iter()
            .filter_map(|row| stations_for(row, kind))
            .collect();

        debug!(
            family = %family,
            interpolation = %interpolation,
            rows = total,
            resolved = mapping.len(),
            "Resolved grid mapping"
        );
        Ok(Some(mapping))
    }
}

fn stations_for(row: GridMapRecord, kind: MappingKind) -> Option<(GridCellId, SourceStations)> {
    let stations = match kind {
        MappingKind::Forecast => row.fcst.map(SourceStations::Forecast)?,
        MappingKind::Observation => SourceStations::observation(
            row.obs
                .into_iter()
                .map(|slot| slot.map(|s| s.as_str().to_string())),
        )?,
    };
    Some((row.grid_id, stations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rain_common::StationId;
    use test_utils::{cell, flo2d_250, forecast_mapping, mdpa, observation_mapping, MemoryReferenceStore};

    fn resolver(records: Vec<GridMapRecord>) -> GridMappingResolver {
        GridMappingResolver::new(Arc::new(MemoryReferenceStore::with_records(records)))
    }

    #[tokio::test]
    async fn test_forecast_mapping() {
        let r = resolver(vec![forecast_mapping(1, "1043"), observation_mapping(2, &["100066"])]);
        let mapping = r
            .resolve(&mdpa(), &flo2d_250(), MappingKind::Forecast)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.get(&cell(1)),
            Some(&SourceStations::Forecast(StationId::new("1043")))
        );
    }

    #[tokio::test]
    async fn test_observation_mapping_keeps_slot_order() {
        let r = resolver(vec![observation_mapping(2, &["100066", "100072"])]);
        let mapping = r
            .resolve(&mdpa(), &flo2d_250(), MappingKind::Observation)
            .await
            .unwrap()
            .unwrap();

        let stations = mapping.get(&cell(2)).unwrap().stations();
        assert_eq!(stations, &[StationId::new("100066"), StationId::new("100072")]);
    }

    #[tokio::test]
    async fn test_no_rows_is_none() {
        let r = resolver(vec![]);
        let mapping = r
            .resolve(&mdpa(), &flo2d_250(), MappingKind::Forecast)
            .await
            .unwrap();
        assert!(mapping.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = MemoryReferenceStore::new();
        store.set_unavailable(true);
        let r = GridMappingResolver::new(Arc::new(store));
        let err = r
            .resolve(&mdpa(), &flo2d_250(), MappingKind::Forecast)
            .await
            .unwrap_err();
        assert!(!err.is_cell_local());
    }
}

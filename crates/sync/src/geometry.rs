//! Loaders for the static CSV inputs: model grid geometry, the active
//! observation station list and grid-to-station mapping tables.
//!
//! All files carry a header row; surrounding whitespace is trimmed.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use rain_common::{
    GridCellId, GridCellMetadata, GridInterpolation, ModelFamily, SourceStations, StationId,
    SyncError, SyncResult, ValueMethod,
};
use storage::GridMapRecord;

use crate::resolver::GridMapping;

/// `grid_index,longitude,latitude`
#[derive(Debug, Deserialize)]
struct GeometryRow {
    grid_index: String,
    longitude: f64,
    latitude: f64,
}

/// `hash_id,run_name,station_id,name,latitude,longitude`
#[derive(Debug, Deserialize)]
struct StationRow {
    hash_id: String,
    run_name: String,
    #[allow(dead_code)]
    station_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

/// `grid_index,obs1,obs2,obs3,fcst`
#[derive(Debug, Deserialize)]
struct MappingRow {
    grid_index: String,
    obs1: Option<String>,
    obs2: Option<String>,
    obs3: Option<String>,
    fcst: Option<String>,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> SyncResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, err: csv::Error) -> SyncError {
    if err.is_io_error() {
        SyncError::Io(format!("{}: {}", path.display(), err))
    } else {
        SyncError::parse("csv row", format!("{}: {}", path.display(), err))
    }
}

/// Grid cells of a model grid, one per geometry row.
///
/// Cell ids are `"{family}_{grid_index}_{interpolation}"`.
pub fn load_grid_cells(
    path: &Path,
    family: &ModelFamily,
    interpolation: &GridInterpolation,
    method: ValueMethod,
    model: &str,
) -> SyncResult<Vec<GridCellMetadata>> {
    let rows: Vec<GeometryRow> = read_rows(path)?;
    let cells = rows
        .into_iter()
        .map(|row| {
            let grid_id = GridCellId::new(family, &row.grid_index, interpolation)?;
            Ok(GridCellMetadata::new(
                grid_id,
                method,
                model,
                row.latitude,
                row.longitude,
            ))
        })
        .collect::<SyncResult<Vec<_>>>()?;

    info!(path = %path.display(), cells = cells.len(), "Loaded grid geometry");
    Ok(cells)
}

/// One cell per active observation station, mapped to the station's own
/// hash id.
///
/// Cell ids are `"rainfall_{run_name}_{name}_{interpolation}"`.
pub fn load_station_cells(
    path: &Path,
    interpolation: &GridInterpolation,
    method: ValueMethod,
    model: &str,
) -> SyncResult<(Vec<GridCellMetadata>, GridMapping)> {
    let rows: Vec<StationRow> = read_rows(path)?;
    let family = ModelFamily::rainfall_stations();

    let mut cells = Vec::with_capacity(rows.len());
    let mut mapping = GridMapping::with_capacity(rows.len());
    for row in rows {
        let spatial_index = format!("{}_{}", row.run_name, row.name);
        let grid_id = GridCellId::new(&family, &spatial_index, interpolation)?;
        if let Some(station) = StationId::non_blank(Some(row.hash_id)) {
            mapping.insert(grid_id.clone(), SourceStations::Observation(vec![station]));
        }
        cells.push(GridCellMetadata::new(
            grid_id,
            method,
            model,
            row.latitude,
            row.longitude,
        ));
    }

    info!(path = %path.display(), stations = cells.len(), "Loaded active stations");
    Ok((cells, mapping))
}

/// Mapping table rows keyed by the built grid id.
pub fn load_grid_mappings(
    path: &Path,
    family: &ModelFamily,
    interpolation: &GridInterpolation,
) -> SyncResult<Vec<GridMapRecord>> {
    let rows: Vec<MappingRow> = read_rows(path)?;
    rows.into_iter()
        .map(|row| {
            Ok(GridMapRecord {
                grid_id: GridCellId::new(family, &row.grid_index, interpolation)?,
                obs: [
                    StationId::non_blank(row.obs1),
                    StationId::non_blank(row.obs2),
                    StationId::non_blank(row.obs3),
                ],
                fcst: StationId::non_blank(row.fcst),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{flo2d_250, mdpa, temp_test_dir, write_file};

    #[test]
    fn test_load_grid_cells() {
        let dir = temp_test_dir();
        let path = write_file(
            dir.path(),
            "flo2d_250m.csv",
            "grid_index,longitude,latitude\n1, 79.8581231 ,6.9112345678\n2,79.86,6.92\n",
        );

        let cells = load_grid_cells(
            &path,
            &flo2d_250(),
            &mdpa(),
            ValueMethod::MultiModelEnsemble,
            "FLO2D_250",
        )
        .unwrap();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].grid_id.as_str(), "flo2d_250_1_MDPA");
        assert_eq!(cells[0].longitude, 79.858123);
        assert_eq!(cells[0].latitude, 6.911235);
        assert_eq!(cells[1].model, "FLO2D_250");
    }

    #[test]
    fn test_load_station_cells_maps_hash_id() {
        let dir = temp_test_dir();
        let path = write_file(
            dir.path(),
            "stations.csv",
            "hash_id,run_name,station_id,name,latitude,longitude\n\
             abc123,Leecom,100066,Kottawa,6.84,79.96\n",
        );

        let (cells, mapping) =
            load_station_cells(&path, &mdpa(), ValueMethod::Observation, "HecHMS").unwrap();

        assert_eq!(cells[0].grid_id.as_str(), "rainfall_Leecom_Kottawa_MDPA");
        assert_eq!(
            mapping.get(&cells[0].grid_id),
            Some(&SourceStations::Observation(vec![StationId::new("abc123")]))
        );
    }

    #[test]
    fn test_load_grid_mappings_blank_slots() {
        let dir = temp_test_dir();
        let path = write_file(
            dir.path(),
            "mapping.csv",
            "grid_index,obs1,obs2,obs3,fcst\n7,100066,,,1043\n",
        );

        let records = load_grid_mappings(&path, &flo2d_250(), &mdpa()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grid_id.as_str(), "flo2d_250_7_MDPA");
        assert_eq!(records[0].obs, [Some(StationId::new("100066")), None, None]);
        assert_eq!(records[0].fcst, Some(StationId::new("1043")));
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let dir = temp_test_dir();
        let path = write_file(
            dir.path(),
            "bad.csv",
            "grid_index,longitude,latitude\n1,east,6.9\n",
        );
        let err = load_grid_cells(&path, &flo2d_250(), &mdpa(), ValueMethod::MultiModelEnsemble, "FLO2D_250")
            .unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_grid_mappings(Path::new("/nonexistent/mapping.csv"), &flo2d_250(), &mdpa())
            .unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}

//! Tests for grid cell and timeseries identity.

use rain_common::{
    GridCellId, GridCellMetadata, GridIdPattern, GridInterpolation, ModelFamily, TimeseriesId,
    ValueMethod,
};

fn cell(family: &str, index: &str) -> GridCellId {
    GridCellId::new(
        &ModelFamily::new(family).unwrap(),
        index,
        &GridInterpolation::new("MDPA").unwrap(),
    )
    .unwrap()
}

// ============================================================================
// Grid id construction
// ============================================================================

#[test]
fn test_station_cell_id_uses_rainfall_family() {
    let id = GridCellId::new(
        &ModelFamily::rainfall_stations(),
        "Colombo_Kolonnawa",
        &GridInterpolation::new("MDPA").unwrap(),
    )
    .unwrap();
    assert_eq!(id.as_str(), "rainfall_Colombo_Kolonnawa_MDPA");
}

#[test]
fn test_built_ids_match_their_family_pattern() {
    let pattern = GridIdPattern::new(
        ModelFamily::new("flo2d_150").unwrap(),
        GridInterpolation::new("MDPA").unwrap(),
    );
    for index in ["1", "77", "10440"] {
        assert!(pattern.matches(cell("flo2d_150", index).as_str()));
        assert!(!pattern.matches(cell("flo2d_30", index).as_str()));
    }
}

// ============================================================================
// Timeseries id derivation
// ============================================================================

#[test]
fn test_distinct_cells_get_distinct_ids() {
    let a = TimeseriesId::derive(&cell("flo2d_250", "1"), ValueMethod::MultiModelEnsemble);
    let b = TimeseriesId::derive(&cell("flo2d_250", "2"), ValueMethod::MultiModelEnsemble);
    assert_ne!(a, b);
}

#[test]
fn test_id_ignores_coordinates_and_model() {
    let grid = cell("flo2d_250", "9");
    let m1 = GridCellMetadata::new(grid.clone(), ValueMethod::SingleForecast, "FLO2D_250", 7.0, 80.0);
    let m2 = GridCellMetadata::new(grid, ValueMethod::SingleForecast, "HecHMS", 7.1, 80.1);
    assert_eq!(
        TimeseriesId::derive(&m1.grid_id, m1.method),
        TimeseriesId::derive(&m2.grid_id, m2.method)
    );
}

//! Common grid and station fixtures.

use rain_common::{
    GridCellId, GridCellMetadata, GridIdPattern, GridInterpolation, ModelFamily, StationId,
    ValueMethod,
};
use storage::GridMapRecord;

/// The `flo2d_250` model family.
pub fn flo2d_250() -> ModelFamily {
    ModelFamily::new("flo2d_250").expect("valid family")
}

/// The `MDPA` interpolation scheme.
pub fn mdpa() -> GridInterpolation {
    GridInterpolation::new("MDPA").expect("valid interpolation")
}

/// Pattern selecting every `flo2d_250_*_MDPA` cell.
pub fn mdpa_pattern() -> GridIdPattern {
    GridIdPattern::new(flo2d_250(), mdpa())
}

/// `flo2d_250_{index}_MDPA`.
pub fn cell(index: u32) -> GridCellId {
    GridCellId::new(&flo2d_250(), &index.to_string(), &mdpa()).expect("valid grid id")
}

/// Metadata for [`cell`] `index` on a small coordinate lattice.
pub fn sample_metadata(index: u32, method: ValueMethod) -> GridCellMetadata {
    GridCellMetadata::new(
        cell(index),
        method,
        "FLO2D_250",
        7.0 + index as f64 * 0.0025,
        79.8 + index as f64 * 0.0025,
    )
}

/// Mapping row with a forecast station and no observation stations.
pub fn forecast_mapping(index: u32, station: &str) -> GridMapRecord {
    GridMapRecord {
        grid_id: cell(index),
        obs: [None, None, None],
        fcst: Some(StationId::new(station)),
    }
}

/// Mapping row with the given observation stations and no forecast station.
pub fn observation_mapping(index: u32, stations: &[&str]) -> GridMapRecord {
    let mut obs: [Option<StationId>; 3] = [None, None, None];
    for (slot, station) in obs.iter_mut().zip(stations) {
        *slot = Some(StationId::new(*station));
    }
    GridMapRecord {
        grid_id: cell(index),
        obs,
        fcst: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_renders_family_index_interpolation() {
        assert_eq!(cell(1043).as_str(), "flo2d_250_1043_MDPA");
        assert!(mdpa_pattern().matches(cell(7).as_str()));
    }

    #[test]
    fn test_observation_mapping_fills_slots_in_order() {
        let record = observation_mapping(3, &["100066", "100067"]);
        assert_eq!(record.obs[0], Some(StationId::new("100066")));
        assert_eq!(record.obs[1], Some(StationId::new("100067")));
        assert_eq!(record.obs[2], None);
    }
}

//! Grid cell identity and metadata.
//!
//! A grid cell is addressed by `(model_family, spatial_index, interpolation)`
//! and rendered as `"{model_family}_{spatial_index}_{interpolation}"`, e.g.
//! `flo2d_250_1043_MDPA` or `rainfall_Colombo_Kolonnawa_MDPA`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{SyncError, SyncResult, ValueMethod};

/// Decimal places kept for grid cell coordinates.
const COORDINATE_DECIMALS: i32 = 6;

/// Model family prefix of a grid identifier (e.g. `flo2d_250`, `rainfall`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelFamily(String);

impl ModelFamily {
    pub fn new(family: impl Into<String>) -> SyncResult<Self> {
        let family = family.into();
        let valid = !family.is_empty()
            && !family.starts_with('_')
            && !family.ends_with('_')
            && family.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(SyncError::parse("model family", family));
        }
        Ok(Self(family))
    }

    /// Family used for cells built from the active observation station list.
    pub fn rainfall_stations() -> Self {
        Self("rainfall".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModelFamily {
    type Error = SyncError;

    fn try_from(value: String) -> SyncResult<Self> {
        Self::new(value)
    }
}

impl From<ModelFamily> for String {
    fn from(value: ModelFamily) -> Self {
        value.0
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spatial interpolation scheme relating stations to grid cells (e.g. `MDPA`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridInterpolation(String);

impl GridInterpolation {
    pub fn new(scheme: impl Into<String>) -> SyncResult<Self> {
        let scheme = scheme.into();
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SyncError::parse("grid interpolation", scheme));
        }
        Ok(Self(scheme))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GridInterpolation {
    type Error = SyncError;

    fn try_from(value: String) -> SyncResult<Self> {
        Self::new(value)
    }
}

impl From<GridInterpolation> for String {
    fn from(value: GridInterpolation) -> Self {
        value.0
    }
}

impl fmt::Display for GridInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendered grid cell identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridCellId(String);

impl GridCellId {
    /// Build the identifier from its three components.
    pub fn new(
        family: &ModelFamily,
        spatial_index: &str,
        interpolation: &GridInterpolation,
    ) -> SyncResult<Self> {
        let spatial_index = spatial_index.trim();
        if spatial_index.is_empty() {
            return Err(SyncError::parse("spatial index", spatial_index));
        }
        Ok(Self(format!("{}_{}_{}", family, spatial_index, interpolation)))
    }

    /// Wrap an identifier read back from a store.
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selects every grid identifier of the form `"{family}_*_{interpolation}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIdPattern {
    family: ModelFamily,
    interpolation: GridInterpolation,
}

impl GridIdPattern {
    /// Escape character used in the SQL `LIKE` rendering.
    pub const LIKE_ESCAPE: char = '$';

    pub fn new(family: ModelFamily, interpolation: GridInterpolation) -> Self {
        Self {
            family,
            interpolation,
        }
    }

    pub fn family(&self) -> &ModelFamily {
        &self.family
    }

    pub fn interpolation(&self) -> &GridInterpolation {
        &self.interpolation
    }

    /// Render as a SQL `LIKE` pattern using [`Self::LIKE_ESCAPE`].
    ///
    /// `flo2d_250` + `MDPA` becomes `flo2d$_250$_%$_MDPA`.
    pub fn to_like(&self) -> String {
        format!(
            "{}{esc}_%{esc}_{}",
            escape_like(self.family.as_str()),
            escape_like(self.interpolation.as_str()),
            esc = Self::LIKE_ESCAPE
        )
    }

    /// In-process equivalent of [`Self::to_like`].
    pub fn matches(&self, grid_id: &str) -> bool {
        let prefix = format!("{}_", self.family);
        let suffix = format!("_{}", self.interpolation);
        grid_id.len() >= prefix.len() + suffix.len()
            && grid_id.starts_with(&prefix)
            && grid_id.ends_with(&suffix)
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        if matches!(c, '_' | '%' | '$') {
            out.push(GridIdPattern::LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Metadata snapshot stored alongside a timeseries record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCellMetadata {
    pub grid_id: GridCellId,
    pub method: ValueMethod,
    /// Target hydrological model the series feeds (e.g. `FLO2D_250`, `HecHMS`).
    pub model: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GridCellMetadata {
    /// Coordinates are rounded to six decimal places.
    pub fn new(
        grid_id: GridCellId,
        method: ValueMethod,
        model: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            grid_id,
            method,
            model: model.into(),
            latitude: round_coordinate(latitude),
            longitude: round_coordinate(longitude),
        }
    }
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flo2d() -> ModelFamily {
        ModelFamily::new("flo2d_250").unwrap()
    }

    fn mdpa() -> GridInterpolation {
        GridInterpolation::new("MDPA").unwrap()
    }

    #[test]
    fn test_grid_cell_id_format() {
        let id = GridCellId::new(&flo2d(), "1043", &mdpa()).unwrap();
        assert_eq!(id.as_str(), "flo2d_250_1043_MDPA");
    }

    #[test]
    fn test_empty_spatial_index_rejected() {
        assert!(GridCellId::new(&flo2d(), "  ", &mdpa()).is_err());
    }

    #[test]
    fn test_invalid_family_rejected() {
        assert!(ModelFamily::new("").is_err());
        assert!(ModelFamily::new("flo2d 250").is_err());
        assert!(ModelFamily::new("_flo2d").is_err());
        assert!(GridInterpolation::new("MD_PA").is_err());
    }

    #[test]
    fn test_like_pattern_escapes_underscores() {
        let pattern = GridIdPattern::new(flo2d(), mdpa());
        assert_eq!(pattern.to_like(), "flo2d$_250$_%$_MDPA");

        let rainfall = GridIdPattern::new(ModelFamily::rainfall_stations(), mdpa());
        assert_eq!(rainfall.to_like(), "rainfall$_%$_MDPA");
    }

    #[test]
    fn test_pattern_matches() {
        let pattern = GridIdPattern::new(flo2d(), mdpa());
        assert!(pattern.matches("flo2d_250_1_MDPA"));
        assert!(pattern.matches("flo2d_250_1043_MDPA"));
        assert!(!pattern.matches("flo2d_150_1_MDPA"));
        assert!(!pattern.matches("flo2d_250_1_TP"));
        assert!(!pattern.matches("flo2d_2501_MDPA_x"));
    }

    #[test]
    fn test_metadata_rounds_coordinates() {
        let id = GridCellId::new(&flo2d(), "7", &mdpa()).unwrap();
        let meta = GridCellMetadata::new(id, ValueMethod::MultiModelEnsemble, "FLO2D_250", 6.912345678, 79.8612344);
        assert_eq!(meta.latitude, 6.912346);
        assert_eq!(meta.longitude, 79.861234);
    }

    #[test]
    fn test_family_deserializes_with_validation() {
        let ok: ModelFamily = serde_json::from_str("\"flo2d_30\"").unwrap();
        assert_eq!(ok.as_str(), "flo2d_30");
        assert!(serde_json::from_str::<ModelFamily>("\"bad family\"").is_err());
    }
}

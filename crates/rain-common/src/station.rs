//! Upstream station identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of observation stations feeding one grid cell.
pub const MAX_OBSERVATION_STATIONS: usize = 3;

/// Identifier of an upstream station in a forecast or observation store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns `None` for blank values, which the mapping tables use for
    /// unused station slots.
    pub fn non_blank(id: Option<String>) -> Option<Self> {
        id.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream stations that feed a single grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStations {
    /// One forecast station, sampled from every configured forecast model
    Forecast(StationId),
    /// Up to three observation stations
    Observation(Vec<StationId>),
}

impl SourceStations {
    /// Build an observation mapping from nullable slots, keeping at most
    /// [`MAX_OBSERVATION_STATIONS`] non-blank ids. Returns `None` when every
    /// slot is blank.
    pub fn observation<I>(slots: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let stations: Vec<StationId> = slots
            .into_iter()
            .filter_map(StationId::non_blank)
            .take(MAX_OBSERVATION_STATIONS)
            .collect();
        if stations.is_empty() {
            None
        } else {
            Some(Self::Observation(stations))
        }
    }

    pub fn stations(&self) -> &[StationId] {
        match self {
            Self::Forecast(station) => std::slice::from_ref(station),
            Self::Observation(stations) => stations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_skips_blank_slots() {
        let stations = SourceStations::observation([
            Some("100066".to_string()),
            None,
            Some("  ".to_string()),
        ])
        .unwrap();
        assert_eq!(stations.stations(), &[StationId::new("100066")]);
    }

    #[test]
    fn test_observation_all_blank_is_none() {
        assert!(SourceStations::observation([None, Some(String::new()), None]).is_none());
    }

    #[test]
    fn test_observation_caps_station_count() {
        let slots = (0..5).map(|i| Some(format!("st{}", i)));
        let stations = SourceStations::observation(slots).unwrap();
        assert_eq!(stations.stations().len(), MAX_OBSERVATION_STATIONS);
    }

    #[test]
    fn test_forecast_exposes_single_station() {
        let stations = SourceStations::Forecast(StationId::new("d03_1043"));
        assert_eq!(stations.stations().len(), 1);
    }
}

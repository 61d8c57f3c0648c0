//! Upstream series sources.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::info;

use rain_common::{StationId, SyncError, SyncResult, TimePoint};
use storage::{ForecastSelector, ForecastStore, ObservationStore};

/// One upstream model or observation feed the driver samples per station.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Raw series for `station` with timestamps at or after `since`.
    async fn fetch(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>>;
}

/// Latest run of one forecast model.
pub struct ForecastSource {
    store: Arc<dyn ForecastStore>,
    selector: ForecastSelector,
    name: String,
}

impl ForecastSource {
    pub fn new(store: Arc<dyn ForecastStore>, selector: ForecastSelector, name: impl Into<String>) -> Self {
        Self {
            store,
            selector,
            name: name.into(),
        }
    }

    /// Resolve `(model, version)` to its source id and build the source.
    ///
    /// An unknown model or version is a configuration error.
    pub async fn resolve(
        store: Arc<dyn ForecastStore>,
        model: &str,
        version: &str,
        sim_tag: &str,
        variable_id: i32,
        unit_id: i32,
    ) -> SyncResult<Self> {
        let source_id = store.source_id(model, version).await?.ok_or_else(|| {
            SyncError::InvalidConfig(format!("Unknown forecast source: {} {}", model, version))
        })?;

        info!(model, version, source_id, "Resolved forecast source");
        let selector = ForecastSelector {
            source_id,
            sim_tag: sim_tag.to_string(),
            variable_id,
            unit_id,
        };
        Ok(Self::new(store, selector, format!("{}_{}", model, version)))
    }

    pub fn selector(&self) -> &ForecastSelector {
        &self.selector
    }
}

#[async_trait]
impl SeriesSource for ForecastSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        self.store.latest_series(&self.selector, station, since).await
    }
}

/// Raw observation readings.
pub struct ObservationSource {
    store: Arc<dyn ObservationStore>,
}

impl ObservationSource {
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SeriesSource for ObservationSource {
    fn name(&self) -> &str {
        "observation"
    }

    async fn fetch(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        self.store.series_since(station, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{at, series, MemoryForecastStore};

    #[tokio::test]
    async fn test_resolve_known_source() {
        let store = Arc::new(MemoryForecastStore::new());
        store.add_source("WRF_A", "v4", 7);
        store.set_series(7, &StationId::new("1043"), series(at(0, 0), 15, &[1.0, 2.0]));

        let source = ForecastSource::resolve(store, "WRF_A", "v4", "evening_18hrs", 1, 1)
            .await
            .unwrap();

        assert_eq!(source.name(), "WRF_A_v4");
        assert_eq!(source.selector().source_id, 7);
        let points = source.fetch(&StationId::new("1043"), None).await.unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_unknown_source_is_config_error() {
        let store = Arc::new(MemoryForecastStore::new());
        let result = ForecastSource::resolve(store, "WRF_Z", "v4", "evening_18hrs", 1, 1).await;
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }
}

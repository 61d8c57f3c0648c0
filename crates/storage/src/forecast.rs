//! Forecast store access (read-only).
//!
//! Each forecast model writes one `run` row per `(source, station, sim_tag,
//! variable, unit)` and re-issues its `data` rows on every model run, tagged
//! with the run's forecast generation time (`fgt`). Only the most recent
//! generation is read.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::debug;

use rain_common::{StationId, SyncError, SyncResult, TimePoint};

use crate::traits::{ForecastSelector, ForecastStore};

/// Database-backed forecast store.
#[derive(Clone)]
pub struct PgForecastStore {
    pool: PgPool,
}

impl PgForecastStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastStore for PgForecastStore {
    async fn source_id(&self, model: &str, version: &str) -> SyncResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM source WHERE model = $1 AND version = $2")
            .bind(model)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))
    }

    async fn latest_series(
        &self,
        selector: &ForecastSelector,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        let rows = sqlx::query_as::<_, (NaiveDateTime, f64)>(
            r#"
            WITH target AS (
                SELECT id FROM run
                WHERE source = $1 AND CAST(station AS TEXT) = $2
                  AND sim_tag = $3 AND variable = $4 AND unit = $5
                LIMIT 1
            )
            SELECT d.time, d.value FROM data d
            JOIN target t ON d.id = t.id
            WHERE d.fgt = (SELECT MAX(fgt) FROM data WHERE id = t.id)
              AND ($6::timestamp IS NULL OR d.time >= $6)
            ORDER BY d.time
            "#,
        )
        .bind(selector.source_id)
        .bind(station.as_str())
        .bind(&selector.sim_tag)
        .bind(selector.variable_id)
        .bind(selector.unit_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))?;

        debug!(
            source_id = selector.source_id,
            station = %station,
            rows = rows.len(),
            "Fetched latest forecast series"
        );

        Ok(rows
            .into_iter()
            .map(|(time, value)| TimePoint::new(time, value))
            .collect())
    }
}

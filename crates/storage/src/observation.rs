//! Observation store access (read-only).

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::debug;

use rain_common::{StationId, SyncError, SyncResult, TimePoint};

use crate::traits::ObservationStore;

/// Database-backed observation store, keyed by station hash id.
#[derive(Clone)]
pub struct PgObservationStore {
    pool: PgPool,
}

impl PgObservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ObservationStore for PgObservationStore {
    async fn series_since(
        &self,
        station: &StationId,
        since: Option<NaiveDateTime>,
    ) -> SyncResult<Vec<TimePoint>> {
        let rows = sqlx::query_as::<_, (NaiveDateTime, f64)>(
            "SELECT time, value FROM data \
             WHERE id = $1 AND ($2::timestamp IS NULL OR time >= $2) \
             ORDER BY time",
        )
        .bind(station.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))?;

        debug!(station = %station, rows = rows.len(), "Fetched observation series");

        Ok(rows
            .into_iter()
            .map(|(time, value)| TimePoint::new(time, value))
            .collect())
    }
}

//! Simulation store using PostgreSQL.
//!
//! Holds one `run` row per `(grid_id, method)` with its `obs_end` cursor,
//! and the canonical 5-minute `data` rows keyed by `(id, time)`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use rain_common::{
    GridCellId, GridCellMetadata, SyncError, SyncResult, TimePoint, TimeseriesId, ValueMethod,
};

use crate::traits::SimulationStore;

/// Rows per multi-row INSERT; three binds each keeps well under the
/// PostgreSQL bind limit.
const UPSERT_CHUNK_ROWS: usize = 1000;

/// Database-backed simulation store.
#[derive(Clone)]
pub struct PgSimulationStore {
    pool: PgPool,
}

impl PgSimulationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `run` and `data` tables if absent.
    pub async fn migrate(&self) -> SyncResult<()> {
        crate::run_schema(&self.pool, SCHEMA_SQL).await
    }
}

#[async_trait]
impl SimulationStore for PgSimulationStore {
    async fn find_timeseries_id(
        &self,
        grid_id: &GridCellId,
        method: ValueMethod,
    ) -> SyncResult<Option<TimeseriesId>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT id FROM run WHERE grid_id = $1 AND method = $2",
        )
        .bind(grid_id.as_str())
        .bind(method.abbreviation())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))?;

        Ok(row.map(TimeseriesId::from_stored))
    }

    async fn insert_run_or_fetch(
        &self,
        id: &TimeseriesId,
        meta: &GridCellMetadata,
    ) -> SyncResult<Option<TimeseriesId>> {
        let row = sqlx::query_scalar::<_, String>(
            r#"
            WITH inserted AS (
                INSERT INTO run (id, grid_id, method, model, latitude, longitude)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                RETURNING id
            )
            SELECT id FROM inserted
            UNION ALL
            SELECT id FROM run WHERE grid_id = $2 AND method = $3
            LIMIT 1
            "#,
        )
        .bind(id.as_str())
        .bind(meta.grid_id.as_str())
        .bind(meta.method.abbreviation())
        .bind(&meta.model)
        .bind(meta.latitude)
        .bind(meta.longitude)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Insert failed: {}", e)))?;

        Ok(row.map(TimeseriesId::from_stored))
    }

    async fn obs_end(&self, id: &TimeseriesId) -> SyncResult<Option<NaiveDateTime>> {
        let cursor = sqlx::query_scalar::<_, Option<NaiveDateTime>>(
            "SELECT obs_end FROM run WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))?;

        Ok(cursor.flatten())
    }

    async fn advance_obs_end(&self, id: &TimeseriesId, end: NaiveDateTime) -> SyncResult<bool> {
        let result = sqlx::query(ADVANCE_CURSOR_SQL)
            .bind(id.as_str())
            .bind(end)
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::DataAccess(format!("Update failed: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_points(&self, id: &TimeseriesId, points: &[TimePoint]) -> SyncResult<u64> {
        let rows = latest_per_timestamp(points);
        let mut written = 0;
        for chunk in rows.chunks(UPSERT_CHUNK_ROWS) {
            written += upsert_query(id, chunk)
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| SyncError::DataAccess(format!("Upsert failed: {}", e)))?
                .rows_affected();
        }
        Ok(written)
    }

    /// Upsert and cursor advance commit together or not at all.
    async fn persist_batch(
        &self,
        id: &TimeseriesId,
        points: &[TimePoint],
    ) -> SyncResult<Option<NaiveDateTime>> {
        let rows = latest_per_timestamp(points);
        let Some(end) = rows.last().map(|p| p.timestamp) else {
            return Ok(None);
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SyncError::DataAccess(format!("Transaction failed: {}", e)))?;

        for chunk in rows.chunks(UPSERT_CHUNK_ROWS) {
            upsert_query(id, chunk)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| SyncError::DataAccess(format!("Upsert failed: {}", e)))?;
        }

        sqlx::query(ADVANCE_CURSOR_SQL)
            .bind(id.as_str())
            .bind(end)
            .execute(&mut *tx)
            .await
            .map_err(|e| SyncError::DataAccess(format!("Update failed: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| SyncError::DataAccess(format!("Commit failed: {}", e)))?;

        debug!(tms_id = %id, rows = rows.len(), obs_end = %end, "Persisted batch");
        Ok(Some(end))
    }
}

fn upsert_query<'a>(id: &'a TimeseriesId, rows: &'a [TimePoint]) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO data (id, time, value) ");
    builder.push_values(rows.iter(), |mut b, point| {
        b.push_bind(id.as_str())
            .push_bind(point.timestamp)
            .push_bind(point.value);
    });
    builder.push(" ON CONFLICT (id, time) DO UPDATE SET value = EXCLUDED.value");
    builder
}

/// Collapse duplicate timestamps (last value wins) and order by time.
///
/// A single `ON CONFLICT DO UPDATE` statement may not touch the same key
/// twice.
pub(crate) fn latest_per_timestamp(points: &[TimePoint]) -> Vec<TimePoint> {
    let latest: BTreeMap<NaiveDateTime, f64> =
        points.iter().map(|p| (p.timestamp, p.value)).collect();
    latest
        .into_iter()
        .map(|(timestamp, value)| TimePoint::new(timestamp, value))
        .collect()
}

const ADVANCE_CURSOR_SQL: &str =
    "UPDATE run SET obs_end = $2 WHERE id = $1 AND (obs_end IS NULL OR obs_end < $2)";

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS run (
    id VARCHAR(64) PRIMARY KEY,
    grid_id VARCHAR(255) NOT NULL,
    method VARCHAR(16) NOT NULL,
    model VARCHAR(64) NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    obs_end TIMESTAMP NULL,
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),

    UNIQUE(grid_id, method)
);

CREATE TABLE IF NOT EXISTS data (
    id VARCHAR(64) NOT NULL REFERENCES run(id),
    time TIMESTAMP NOT NULL,
    value DOUBLE PRECISION NOT NULL,

    PRIMARY KEY (id, time)
);

CREATE INDEX IF NOT EXISTS idx_run_grid_id ON run(grid_id)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn p(m: u32, v: f64) -> TimePoint {
        let ts = NaiveDate::from_ymd_opt(2019, 5, 20)
            .unwrap()
            .and_hms_opt(1, m, 0)
            .unwrap();
        TimePoint::new(ts, v)
    }

    #[test]
    fn test_latest_per_timestamp_last_wins_and_sorts() {
        let rows = latest_per_timestamp(&[p(10, 1.0), p(5, 2.0), p(10, 3.0)]);
        assert_eq!(rows, vec![p(5, 2.0), p(10, 3.0)]);
    }

    #[test]
    fn test_latest_per_timestamp_empty() {
        assert!(latest_per_timestamp(&[]).is_empty());
    }

    #[test]
    fn test_upsert_sql_shape() {
        let id = TimeseriesId::from_stored("abc");
        let rows = [p(0, 1.0), p(5, 2.0)];
        let builder = upsert_query(&id, &rows);
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO data (id, time, value) VALUES"));
        assert!(sql.ends_with("ON CONFLICT (id, time) DO UPDATE SET value = EXCLUDED.value"));
    }
}

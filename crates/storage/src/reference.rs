//! Grid to station mapping tables using PostgreSQL.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use rain_common::{GridCellId, GridIdPattern, StationId, SyncError, SyncResult};

use crate::traits::{GridMapRecord, ReferenceStore};

/// Database-backed reference store over the `grid_map` table.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `grid_map` table if absent.
    pub async fn migrate(&self) -> SyncResult<()> {
        crate::run_schema(&self.pool, SCHEMA_SQL).await
    }
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn grid_mappings(&self, pattern: &GridIdPattern) -> SyncResult<Vec<GridMapRecord>> {
        let like = pattern.to_like();
        let rows = sqlx::query_as::<_, GridMapRow>(
            "SELECT grid_id, obs1, obs2, obs3, fcst FROM grid_map \
             WHERE grid_id LIKE $1 ESCAPE '$' ORDER BY grid_id",
        )
        .bind(&like)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Query failed: {}", e)))?;

        debug!(pattern = %like, rows = rows.len(), "Loaded grid mappings");
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn upsert_grid_mappings(&self, records: &[GridMapRecord]) -> SyncResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SyncError::DataAccess(format!("Transaction failed: {}", e)))?;

        let mut written = 0;
        for record in records {
            let [obs1, obs2, obs3] = &record.obs;
            written += sqlx::query(
                r#"
                INSERT INTO grid_map (grid_id, obs1, obs2, obs3, fcst)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (grid_id)
                DO UPDATE SET
                    obs1 = EXCLUDED.obs1,
                    obs2 = EXCLUDED.obs2,
                    obs3 = EXCLUDED.obs3,
                    fcst = EXCLUDED.fcst
                "#,
            )
            .bind(record.grid_id.as_str())
            .bind(obs1.as_ref().map(StationId::as_str))
            .bind(obs2.as_ref().map(StationId::as_str))
            .bind(obs3.as_ref().map(StationId::as_str))
            .bind(record.fcst.as_ref().map(StationId::as_str))
            .execute(&mut *tx)
            .await
            .map_err(|e| SyncError::DataAccess(format!("Insert failed: {}", e)))?
            .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| SyncError::DataAccess(format!("Commit failed: {}", e)))?;

        Ok(written)
    }
}

/// Internal row type for database queries.
#[derive(FromRow)]
struct GridMapRow {
    grid_id: String,
    obs1: Option<String>,
    obs2: Option<String>,
    obs3: Option<String>,
    fcst: Option<String>,
}

impl From<GridMapRow> for GridMapRecord {
    fn from(row: GridMapRow) -> Self {
        GridMapRecord {
            grid_id: GridCellId::from_stored(row.grid_id),
            obs: [
                StationId::non_blank(row.obs1),
                StationId::non_blank(row.obs2),
                StationId::non_blank(row.obs3),
            ],
            fcst: StationId::non_blank(row.fcst),
        }
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS grid_map (
    grid_id VARCHAR(255) PRIMARY KEY,
    obs1 VARCHAR(64) NULL,
    obs2 VARCHAR(64) NULL,
    obs3 VARCHAR(64) NULL,
    fcst VARCHAR(64) NULL
)
"#;

//! Storage abstractions for rainfall sync.
//!
//! Provides store traits and their PostgreSQL implementations for:
//! - Reference store: grid cell to upstream station mappings
//! - Simulation store: timeseries registry, cursors and 5-minute data
//! - Forecast store: per-model forecast runs (read-only)
//! - Observation store: raw station readings (read-only)

pub mod forecast;
pub mod observation;
pub mod reference;
pub mod simulation;
pub mod traits;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use rain_common::{SyncError, SyncResult};

pub use forecast::PgForecastStore;
pub use observation::PgObservationStore;
pub use reference::PgReferenceStore;
pub use simulation::PgSimulationStore;
pub use traits::{
    ForecastSelector, ForecastStore, GridMapRecord, ObservationStore, ReferenceStore,
    SimulationStore,
};

/// Open a PostgreSQL connection pool.
pub async fn connect(database_url: &str, max_connections: u32) -> SyncResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| SyncError::DataAccess(format!("Connection failed: {}", e)))?;

    info!(max_connections, "Opened database pool");
    Ok(pool)
}

/// Run a `;`-separated schema script statement by statement.
pub(crate) async fn run_schema(pool: &PgPool, schema: &str) -> SyncResult<()> {
    for statement in schema.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed)
                .execute(pool)
                .await
                .map_err(|e| SyncError::DataAccess(format!("Migration failed: {}", e)))?;
        }
    }
    Ok(())
}

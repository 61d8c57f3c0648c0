//! Time handling for rainfall timeseries.
//!
//! All timestamps are naive wall-clock instants, exactly as the upstream
//! stores record them.

use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{GridCellId, ValueMethod};

/// Step of every persisted series.
pub const CANONICAL_STEP_MINUTES: i64 = 5;

/// Placeholder the upstream stores use for a missing reading.
pub const MISSING_SENTINEL: f64 = -99999.0;

/// The canonical 5-minute step as a chrono duration.
pub fn canonical_step() -> Duration {
    Duration::minutes(CANONICAL_STEP_MINUTES)
}

/// Start of the default observation window: `hours` before `now`,
/// truncated to the top of the hour.
pub fn lookback_start(now: NaiveDateTime, hours: u32) -> NaiveDateTime {
    let start = now - Duration::hours(hours as i64);
    start
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(start)
}

/// A single `(timestamp, value)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn is_missing(&self) -> bool {
        (self.value - MISSING_SENTINEL).abs() < 0.5
    }
}

/// Durable identifier of a timeseries in the simulation store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeseriesId(String);

#[derive(Serialize)]
struct IdentityKey<'a> {
    grid_id: &'a str,
    method: &'a str,
}

impl TimeseriesId {
    /// Derive the id for a `(grid_id, method)` pair.
    ///
    /// Lowercase hex SHA-256 of `{"grid_id":..,"method":..}` with keys in
    /// sorted order, so every run derives the same id for the same pair.
    pub fn derive(grid_id: &GridCellId, method: ValueMethod) -> Self {
        let key = IdentityKey {
            grid_id: grid_id.as_str(),
            method: method.abbreviation(),
        };
        // Serializing a struct of two &str cannot fail.
        let payload = serde_json::to_string(&key).unwrap_or_default();
        let digest = Sha256::digest(payload.as_bytes());
        Self(format!("{digest:x}"))
    }

    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeseriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Per-cell outcomes and the run summary.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use rain_common::GridCellId;

/// Why a cell was left untouched this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// No upstream station is mapped to the cell
    Unmapped,
    /// Upstream data could not be aligned (malformed or out-of-order input)
    Unaligned(String),
}

/// Terminal state of one grid cell for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellOutcome {
    /// New points were persisted and the cursor advanced
    Synced { points: usize, cursor: NaiveDateTime },
    /// No upstream data past the cursor
    UpToDate,
    Skipped(SkipReason),
    /// A store operation failed; the cursor is unchanged
    Failed(String),
}

impl CellOutcome {
    /// Label used for the `outcome` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            CellOutcome::Synced { .. } => "synced",
            CellOutcome::UpToDate => "up_to_date",
            CellOutcome::Skipped(_) => "skipped",
            CellOutcome::Failed(_) => "failed",
        }
    }
}

/// Counts of cell outcomes over one job or run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub synced: usize,
    pub up_to_date: usize,
    pub skipped: usize,
    pub failed: usize,
    pub points_persisted: usize,
    /// Cells that failed, with the error message
    pub failures: Vec<(GridCellId, String)>,
}

impl SyncSummary {
    pub fn record(&mut self, grid_id: &GridCellId, outcome: &CellOutcome) {
        match outcome {
            CellOutcome::Synced { points, .. } => {
                self.synced += 1;
                self.points_persisted += points;
            }
            CellOutcome::UpToDate => self.up_to_date += 1,
            CellOutcome::Skipped(_) => self.skipped += 1,
            CellOutcome::Failed(message) => {
                self.failed += 1;
                self.failures.push((grid_id.clone(), message.clone()));
            }
        }
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: SyncSummary) {
        self.synced += other.synced;
        self.up_to_date += other.up_to_date;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.points_persisted += other.points_persisted;
        self.failures.extend(other.failures);
    }

    pub fn total(&self) -> usize {
        self.synced + self.up_to_date + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cells: {} synced, {} up to date, {} skipped, {} failed ({} points)",
            self.total(),
            self.synced,
            self.up_to_date,
            self.skipped,
            self.failed,
            self.points_persisted
        )
    }
}

//! Step-hold resampling onto a regular time grid.
//!
//! Upstream series arrive at a coarser native interval (15-minute forecast
//! accumulations) or as an irregular observation log. Every output tick takes
//! the value of the most recent input record at or before it; values are
//! never interpolated between records.

use chrono::{Duration, NaiveDateTime};
use tracing::trace;

use rain_common::time::canonical_step;
use rain_common::TimePoint;

use crate::{ResampleError, Result};

/// Resamples series onto a fixed step, anchored at an expected start.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    step: Duration,
}

impl Default for Resampler {
    fn default() -> Self {
        Self {
            step: canonical_step(),
        }
    }
}

impl Resampler {
    /// Resampler with a custom step in minutes.
    pub fn with_step_minutes(minutes: i64) -> Result<Self> {
        if minutes <= 0 {
            return Err(ResampleError::InvalidStep(minutes));
        }
        Ok(Self {
            step: Duration::minutes(minutes),
        })
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Resample `raw` onto the grid.
    ///
    /// The grid is anchored at `expected_start` when given, otherwise at the
    /// first input timestamp, and runs up to the last input timestamp. Ticks
    /// that precede the first input record are not emitted. When the first
    /// emitted tick equals `expected_start` it is dropped, since the caller
    /// already holds that instant.
    ///
    /// Fewer than two input records yield an empty series.
    pub fn resample(
        &self,
        raw: &[TimePoint],
        expected_start: Option<NaiveDateTime>,
    ) -> Result<Vec<TimePoint>> {
        if raw.len() < 2 {
            return Ok(Vec::new());
        }

        for pair in raw.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ResampleError::NotIncreasing {
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }

        let first = raw[0].timestamp;
        let last = raw[raw.len() - 1].timestamp;
        let anchor = expected_start.unwrap_or(first);

        if anchor > last {
            return Ok(Vec::new());
        }

        let mut tick = self.first_tick_at_or_after(anchor, first);
        let mut held = 0usize;
        let mut out = Vec::new();

        while tick <= last {
            while held + 1 < raw.len() && raw[held + 1].timestamp <= tick {
                held += 1;
            }
            out.push(TimePoint::new(tick, raw[held].value));
            tick += self.step;
        }

        if let (Some(boundary), Some(head)) = (expected_start, out.first()) {
            if head.timestamp == boundary {
                out.remove(0);
            }
        }

        trace!(
            input = raw.len(),
            output = out.len(),
            anchor = %anchor,
            "Resampled series"
        );

        Ok(out)
    }

    /// First grid tick (anchor + k * step, k >= 0) not earlier than `first`.
    fn first_tick_at_or_after(&self, anchor: NaiveDateTime, first: NaiveDateTime) -> NaiveDateTime {
        if first <= anchor {
            return anchor;
        }
        let step_ms = self.step.num_milliseconds();
        let gap_ms = (first - anchor).num_milliseconds();
        let steps = (gap_ms + step_ms - 1) / step_ms;
        anchor + Duration::milliseconds(steps * step_ms)
    }
}

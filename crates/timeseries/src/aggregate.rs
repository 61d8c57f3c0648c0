//! Merging resampled series from several upstream models.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use rain_common::TimePoint;

/// Per-timestamp accumulator over several source series.
///
/// The first series pushed establishes the base ordering; timestamps that
/// only later sources carry are appended after it in the order they are
/// first seen.
#[derive(Debug, Default)]
pub struct MultiSourceAggregator {
    slots: Vec<(NaiveDateTime, Vec<f64>)>,
    index: HashMap<NaiveDateTime, usize>,
}

impl MultiSourceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every value of `series` against its timestamp.
    pub fn push_series(&mut self, series: &[TimePoint]) {
        for point in series {
            match self.index.get(&point.timestamp) {
                Some(&slot) => self.slots[slot].1.push(point.value),
                None => {
                    self.index.insert(point.timestamp, self.slots.len());
                    self.slots.push((point.timestamp, vec![point.value]));
                }
            }
        }
    }

    /// Number of distinct timestamps seen so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mean of every timestamp's values, with negative means clamped to zero.
    pub fn finish(self) -> Vec<TimePoint> {
        self.slots
            .into_iter()
            .map(|(timestamp, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                TimePoint::new(timestamp, clamp_rainfall(mean))
            })
            .collect()
    }
}

/// Average any number of series into one.
pub fn aggregate(series: &[Vec<TimePoint>]) -> Vec<TimePoint> {
    let mut aggregator = MultiSourceAggregator::new();
    for s in series {
        aggregator.push_series(s);
    }
    aggregator.finish()
}

/// Rainfall cannot be negative; negative means are sensor artifacts.
fn clamp_rainfall(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

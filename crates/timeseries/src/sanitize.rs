//! Missing-value handling for raw upstream readings.

use rain_common::TimePoint;

/// Drop non-finite raw readings. Runs before resampling so the previous
/// reading is held across the dropped one. Returns how many were dropped.
pub fn drop_non_finite(points: &mut Vec<TimePoint>) -> usize {
    let before = points.len();
    points.retain(|p| p.value.is_finite());
    before - points.len()
}

/// Replace the upstream missing sentinel with zero rainfall. Returns how
/// many values were replaced.
pub fn replace_missing(points: &mut [TimePoint]) -> usize {
    let mut replaced = 0;
    for point in points.iter_mut() {
        if point.is_missing() {
            point.value = 0.0;
            replaced += 1;
        }
    }
    replaced
}

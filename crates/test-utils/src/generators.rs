//! Timestamp and series generators.
//!
//! All generators anchor on a fixed day so expected values can be written
//! as clock times.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use rain_common::TimePoint;

/// Fixed calendar day used across the test suite.
pub const TEST_DAY: (i32, u32, u32) = (2019, 6, 2);

/// `hh:mm` on [`TEST_DAY`].
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    let (y, m, d) = TEST_DAY;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test time")
}

/// A series starting at `start` with one value every `step_minutes`.
pub fn series(start: NaiveDateTime, step_minutes: i64, values: &[f64]) -> Vec<TimePoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| TimePoint::new(start + Duration::minutes(step_minutes * i as i64), *v))
        .collect()
}

/// A series built from explicit `(timestamp, value)` pairs.
pub fn points(pairs: &[(NaiveDateTime, f64)]) -> Vec<TimePoint> {
    pairs.iter().map(|(t, v)| TimePoint::new(*t, *v)).collect()
}

/// A 15-minute forecast accumulation series of `count` steps whose values
/// rise by `increment` from `first`.
pub fn forecast_15min(start: NaiveDateTime, count: usize, first: f64, increment: f64) -> Vec<TimePoint> {
    let values: Vec<f64> = (0..count).map(|i| first + increment * i as f64).collect();
    series(start, 15, &values)
}

/// Whether consecutive timestamps are exactly `step_minutes` apart.
pub fn is_regular(points: &[TimePoint], step_minutes: i64) -> bool {
    points
        .windows(2)
        .all(|w| w[1].timestamp - w[0].timestamp == Duration::minutes(step_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_spacing() {
        let s = series(at(0, 0), 15, &[1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s[2].timestamp, at(0, 30));
        assert!(is_regular(&s, 15));
        assert!(!is_regular(&s, 5));
    }

    #[test]
    fn test_forecast_15min_values() {
        let s = forecast_15min(at(6, 0), 4, 1.0, 0.5);
        let values: Vec<f64> = s.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 1.5, 2.0, 2.5]);
    }
}

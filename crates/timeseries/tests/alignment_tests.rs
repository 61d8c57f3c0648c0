//! Resampling and aggregation behaviour on realistic upstream shapes.

use chrono::Duration;

use test_utils::{assert_approx_eq, assert_series, at, forecast_15min, is_regular, points, series};
use timeseries::sanitize::replace_missing;
use timeseries::{aggregate, MultiSourceAggregator, Resampler};

#[test]
fn test_resample_is_deterministic() {
    let raw = points(&[
        (at(6, 0), 0.4),
        (at(6, 3), 0.0),
        (at(6, 11), 1.2),
        (at(6, 26), 0.8),
        (at(6, 40), 0.0),
    ]);
    let r = Resampler::default();
    let first = r.resample(&raw, Some(at(6, 0))).unwrap();
    let second = r.resample(&raw, Some(at(6, 0))).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_15_minute_forecast_upsampled() {
    let raw = series(at(0, 0), 15, &[5.0, 10.0]);
    let out = Resampler::default().resample(&raw, Some(at(0, 0))).unwrap();
    assert_series!(out, at(0, 0), [(5, 5.0), (10, 5.0), (15, 10.0)]);
}

#[test]
fn test_output_is_contiguous_5_minute_grid() {
    let raw = forecast_15min(at(18, 0), 9, 0.0, 0.25);
    let out = Resampler::default().resample(&raw, None).unwrap();

    assert!(is_regular(&out, 5));
    assert_eq!(out.first().map(|p| p.timestamp), Some(at(18, 0)));
    assert_eq!(out.last().map(|p| p.timestamp), Some(at(20, 0)));
    assert_eq!(out.len(), 25);
}

#[test]
fn test_irregular_log_holds_last_reading() {
    let raw = points(&[(at(6, 0), 0.5), (at(6, 3), 1.5), (at(6, 14), 0.0)]);
    let out = Resampler::default().resample(&raw, Some(at(6, 0))).unwrap();
    // 06:05 and 06:10 both hold the 06:03 reading.
    assert_series!(out, at(6, 0), [(5, 1.5), (10, 1.5)]);
}

#[test]
fn test_ticks_before_first_reading_not_emitted() {
    let raw = points(&[(at(6, 7), 2.0), (at(6, 20), 3.0)]);
    let out = Resampler::default().resample(&raw, Some(at(6, 0))).unwrap();
    assert_series!(out, at(6, 0), [(10, 2.0), (15, 2.0), (20, 3.0)]);
}

#[test]
fn test_expected_start_after_data_yields_nothing() {
    let raw = series(at(6, 0), 15, &[1.0, 2.0]);
    let out = Resampler::default()
        .resample(&raw, Some(at(6, 0) + Duration::hours(1)))
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_custom_step() {
    let raw = series(at(0, 0), 30, &[1.0, 2.0]);
    let out = Resampler::with_step_minutes(15)
        .unwrap()
        .resample(&raw, None)
        .unwrap();
    assert_series!(out, at(0, 0), [(0, 1.0), (15, 1.0), (30, 2.0)]);
}

#[test]
fn test_ensemble_of_three_models() {
    let r = Resampler::default();
    let models = [
        series(at(0, 0), 15, &[3.0, 6.0]),
        series(at(0, 0), 15, &[0.0, 0.0]),
        series(at(0, 0), 15, &[0.6, 1.2]),
    ];

    let mut aggregator = MultiSourceAggregator::new();
    assert!(aggregator.is_empty());
    for raw in &models {
        aggregator.push_series(&r.resample(raw, Some(at(0, 0))).unwrap());
    }
    assert_eq!(aggregator.len(), 3);

    let out = aggregator.finish();
    assert_approx_eq!(out[0].value, 1.2, 1e-9);
    assert_approx_eq!(out[2].value, 2.4, 1e-9);
}

#[test]
fn test_sentinel_replaced_before_averaging() {
    let mut a = series(at(0, 5), 5, &[-99999.0, 4.0]);
    let b = series(at(0, 5), 5, &[2.0, 2.0]);
    assert_eq!(replace_missing(&mut a), 1);

    let out = aggregate(&[a, b]);
    assert_series!(out, at(0, 0), [(5, 1.0), (10, 3.0)]);
}

#[test]
fn test_aggregate_never_negative() {
    let out = aggregate(&[
        series(at(0, 0), 5, &[-0.5, -2.0, 1.0]),
        series(at(0, 0), 5, &[0.1, 1.0]),
    ]);
    assert!(out.iter().all(|p| p.value >= 0.0));
    assert_series!(out, at(0, 0), [(0, 0.0), (5, 0.0), (10, 1.0)]);
}

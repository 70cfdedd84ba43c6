//! Trend forecasting over the snapshot history.
//!
//! Slopes come from the Theil–Sen estimator (median of pairwise slopes),
//! which shrugs off the odd outlier snapshot. A metric alerts when it is
//! already past a threshold, or is projected to cross one within the
//! horizon.

use std::fmt;

use serde::Serialize;

use super::snapshot::metric_value;
use crate::algo::round_to;
use crate::config::{ForecastConfig, MetricThreshold};
use crate::types::Snapshot;

/// Slopes smaller than this in magnitude are treated as flat.
pub const MIN_ABS_SLOPE: f64 = 0.05;

/// Fewer snapshots than this yield no forecast at all.
pub const MIN_SNAPSHOTS: usize = 3;

/// Values needed before a slope is estimated.
pub const MIN_TREND_POINTS: usize = 4;

/// Outlook for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    /// Flat, or too little history
    Stable,
    /// Moving, but nowhere near a threshold within the horizon
    Trending,
    /// At or projected past the warning threshold
    Warning,
    /// At or projected past the critical threshold
    Alert,
}

impl fmt::Display for ForecastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stable => "stable",
            Self::Trending => "trending",
            Self::Warning => "warning",
            Self::Alert => "alert",
        })
    }
}

/// A robust linear fit `value ≈ intercept + slope · index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TheilSen {
    /// Median pairwise slope per snapshot
    pub slope: f64,
    /// Median of `value_i − slope · i`
    pub intercept: f64,
}

/// Theil–Sen fit of evenly spaced values. `None` below
/// [`MIN_TREND_POINTS`] values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn theil_sen(values: &[f64]) -> Option<TheilSen> {
    if values.len() < MIN_TREND_POINTS {
        return None;
    }
    let mut slopes = Vec::with_capacity(values.len() * (values.len() - 1) / 2);
    for i in 0..values.len() {
        for j in i + 1..values.len() {
            slopes.push((values[j] - values[i]) / (j - i) as f64);
        }
    }
    let slope = median(&mut slopes);
    let mut intercepts: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| v - slope * i as f64)
        .collect();
    Some(TheilSen {
        slope,
        intercept: median(&mut intercepts),
    })
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Status of a metric at `current`, moving `slope` per snapshot, looked at
/// `horizon` snapshots ahead.
#[must_use]
pub fn classify(current: f64, slope: f64, horizon: u32, threshold: &MetricThreshold) -> ForecastStatus {
    if slope.abs() < MIN_ABS_SLOPE {
        return ForecastStatus::Stable;
    }
    let past = |value: f64, level: f64| {
        if threshold.higher_is_better {
            value <= level
        } else {
            value >= level
        }
    };
    let projected = current + slope * f64::from(horizon);
    for value in [current, projected] {
        if past(value, threshold.critical) {
            return ForecastStatus::Alert;
        }
        if past(value, threshold.warning) {
            return ForecastStatus::Warning;
        }
    }
    ForecastStatus::Trending
}

/// Forecast for one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricForecast {
    /// Snapshot metric name
    pub metric: String,
    /// Latest value, rounded to 2 places
    pub current: f64,
    /// Theil–Sen slope per snapshot, rounded to 4 places (0 with too little history)
    pub slope: f64,
    /// `current + slope · horizon`, rounded to 2 places
    pub forecast_value: f64,
    /// Snapshots ahead
    pub horizon: u32,
    /// Outlook
    pub status: ForecastStatus,
}

/// Forecast every metric that has a threshold in `config`.
///
/// `snapshots` may come in any order. With fewer than [`MIN_SNAPSHOTS`]
/// snapshots the result is empty; metrics with fewer than
/// [`MIN_TREND_POINTS`] values are reported as stable at their current value.
#[must_use]
pub fn forecast(snapshots: &[Snapshot], config: &ForecastConfig, horizon: Option<u32>) -> Vec<MetricForecast> {
    if snapshots.len() < MIN_SNAPSHOTS {
        return Vec::new();
    }
    let horizon = horizon.unwrap_or(config.horizon);
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| (s.timestamp, s.id));

    config
        .thresholds
        .iter()
        .filter_map(|(metric, threshold)| {
            let values: Vec<f64> = ordered.iter().filter_map(|s| metric_value(s, metric)).collect();
            let current = *values.last()?;
            let Some(fit) = theil_sen(&values) else {
                return Some(MetricForecast {
                    metric: metric.clone(),
                    current: round_to(current, 2),
                    slope: 0.0,
                    forecast_value: round_to(current, 2),
                    horizon,
                    status: ForecastStatus::Stable,
                });
            };
            Some(MetricForecast {
                metric: metric.clone(),
                current: round_to(current, 2),
                slope: round_to(fit.slope, 4),
                forecast_value: round_to(current + fit.slope * f64::from(horizon), 2),
                horizon,
                status: classify(current, fit.slope, horizon, threshold),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn theil_sen_ignores_a_single_outlier() {
        let fit = theil_sen(&[1.0, 2.0, 3.0, 100.0, 5.0]).unwrap();

        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!(theil_sen(&[1.0, 2.0, 3.0]).is_none());
    }

    #[rstest]
    #[case::flat(80.0, 0.01, ForecastStatus::Stable)]
    #[case::already_critical(35.0, -1.0, ForecastStatus::Alert)]
    #[case::already_warning(55.0, 0.5, ForecastStatus::Warning)]
    #[case::projected_critical(70.0, -1.0, ForecastStatus::Alert)]
    #[case::projected_warning(70.0, -0.5, ForecastStatus::Warning)]
    #[case::improving(90.0, 0.5, ForecastStatus::Trending)]
    fn health_score_statuses(#[case] current: f64, #[case] slope: f64, #[case] expected: ForecastStatus) {
        let threshold = MetricThreshold::floor(60.0, 40.0);

        assert_eq!(classify(current, slope, 30, &threshold), expected);
    }

    #[test]
    fn rising_cycles_warn() {
        let threshold = MetricThreshold::ceiling(5.0, 10.0);

        assert_eq!(classify(2.0, 0.2, 30, &threshold), ForecastStatus::Warning);
        assert_eq!(classify(2.0, -0.2, 30, &threshold), ForecastStatus::Trending);
    }
}

//! Monthly trend forecasting.
//!
//! Fits ordinary least squares over the monthly series (index positions
//! `0..n` against counts) and extrapolates it. With fewer than
//! [`MIN_TREND_POINTS`] months the forecaster repeats the last known value
//! instead.
//!
//! The confidence band is `1.96` standard deviations of the regression
//! residuals regardless of sample size. That is a normal-theory
//! approximation and not a coverage guarantee, least of all for short
//! series.

use chrono::{Datelike, NaiveDate};
use crime_forecast_models::{ForecastMethod, MonthlyBucket, TrendForecast, TrendForecastPoint};

use crate::ForecastError;

/// Minimum number of months for a real regression.
pub const MIN_TREND_POINTS: usize = 3;

/// z-score of the two-sided 95% interval.
pub const CONFIDENCE_Z: f64 = 1.96;

/// A fitted line `y = slope * x + intercept` over `x = 0..n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Slope per index step.
    pub slope: f64,
    /// Value at index 0.
    pub intercept: f64,
    /// `1 - SSres / SStot`, `None` when the series has no variance.
    pub r_squared: Option<f64>,
    /// Population standard deviation of the residuals.
    pub residual_std_dev: f64,
    /// Number of points fitted.
    pub n: usize,
}

impl LinearFit {
    /// Evaluates the line at index `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Fits ordinary least squares to `values` at indices `0..n`.
///
/// A single point fits a flat line through it.
///
/// # Errors
///
/// Returns [`ForecastError::InsufficientData`] if `values` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn fit_linear(values: &[f64]) -> Result<LinearFit, ForecastError> {
    if values.is_empty() {
        return Err(ForecastError::InsufficientData {
            required: 1,
            actual: 0,
            what: "monthly data points",
        });
    }

    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n.mul_add(sum_x2, -(sum_x * sum_x));
    let slope = if denominator == 0.0 {
        0.0
    } else {
        n.mul_add(sum_xy, -(sum_x * sum_y)) / denominator
    };
    let intercept = slope.mul_add(-sum_x, sum_y) / n;

    let mean = sum_y / n;
    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let residual = y - slope.mul_add(i as f64, intercept);
        ss_res += residual * residual;
        ss_tot += (y - mean) * (y - mean);
    }

    let r_squared = if ss_tot == 0.0 {
        None
    } else {
        Some(1.0 - ss_res / ss_tot)
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        residual_std_dev: (ss_res / n).sqrt(),
        n: values.len(),
    })
}

/// Forecasts `months` future months from a monthly history.
///
/// Future labels continue from the last history label; when the history is
/// empty (or its last label is malformed) they continue from `reference`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn forecast_trend(
    history: &[MonthlyBucket],
    months: u32,
    reference: NaiveDate,
) -> TrendForecast {
    let labels = future_labels(history.last().map(|b| b.label.as_str()), reference, months);

    let values: Vec<f64> = history.iter().map(|b| b.count as f64).collect();
    let fit = match fit_linear(&values) {
        Ok(fit) if history.len() >= MIN_TREND_POINTS => fit,
        _ => return flat_continuation(history, labels),
    };
    let half_width = CONFIDENCE_Z * fit.residual_std_dev;

    let points = labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let predicted = clamp_round(fit.predict((fit.n + i) as f64));
            let center = predicted as f64;
            TrendForecastPoint {
                label,
                predicted,
                upper: clamp_round(center + half_width),
                lower: clamp_round(center - half_width),
            }
        })
        .collect();

    TrendForecast {
        history: history.to_vec(),
        points,
        trend: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_squared,
        method: ForecastMethod::LinearRegression,
    }
}

/// Repeats the last known count (or 0) for every label.
#[allow(clippy::cast_precision_loss)]
fn flat_continuation(history: &[MonthlyBucket], labels: Vec<String>) -> TrendForecast {
    let last = history.last().map_or(0, |b| b.count);
    log::debug!(
        "Only {} months of history, repeating last value {last}",
        history.len()
    );

    TrendForecast {
        history: history.to_vec(),
        points: labels
            .into_iter()
            .map(|label| TrendForecastPoint {
                label,
                predicted: last,
                upper: last,
                lower: last,
            })
            .collect(),
        trend: 0.0,
        intercept: last as f64,
        r_squared: None,
        method: ForecastMethod::FlatContinuation,
    }
}

/// Rounds to the nearest integer and clamps negatives to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_round(value: f64) -> u64 {
    if value.is_nan() {
        return 0;
    }
    value.round().max(0.0) as u64
}

/// Parses a `YYYY-MM` label into `(year, month)`.
#[must_use]
pub fn parse_month_label(label: &str) -> Option<(i32, u32)> {
    let (year, month) = label.split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

fn future_labels(last: Option<&str>, reference: NaiveDate, months: u32) -> Vec<String> {
    let (mut year, mut month) = last
        .and_then(parse_month_label)
        .unwrap_or((reference.year(), reference.month()));

    (0..months)
        .map(|_| {
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
            format!("{year:04}-{month:02}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(counts: &[u64]) -> Vec<MonthlyBucket> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| MonthlyBucket {
                label: format!("2023-{:02}", i + 1),
                count,
            })
            .collect()
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn perfectly_linear_series() {
        let fit = fit_linear(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert!(fit.residual_std_dev.abs() < 1e-9);

        let forecast = forecast_trend(&series(&[1, 2, 3, 4, 5, 6]), 3, reference());
        assert_eq!(forecast.method, ForecastMethod::LinearRegression);
        let predicted: Vec<u64> = forecast.points.iter().map(|p| p.predicted).collect();
        assert_eq!(predicted, [7, 8, 9]);
        for point in &forecast.points {
            assert_eq!(point.lower, point.predicted);
            assert_eq!(point.upper, point.predicted);
        }
        let labels: Vec<&str> = forecast.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["2023-07", "2023-08", "2023-09"]);
    }

    #[test]
    fn single_point_repeats_last_value() {
        let forecast = forecast_trend(&series(&[5]), 3, reference());
        assert_eq!(forecast.method, ForecastMethod::FlatContinuation);
        let predicted: Vec<u64> = forecast.points.iter().map(|p| p.predicted).collect();
        assert_eq!(predicted, [5, 5, 5]);
        assert!(forecast.r_squared.is_none());
    }

    #[test]
    fn empty_history_continues_from_reference_with_zero() {
        let forecast = forecast_trend(&[], 2, reference());
        assert_eq!(forecast.points.len(), 2);
        assert_eq!(forecast.points[0].label, "2024-07");
        assert_eq!(forecast.points[0].predicted, 0);
    }

    #[test]
    fn bands_are_ordered_and_non_negative() {
        let history = series(&[40, 3, 25, 1, 30, 0, 2, 1]);
        let forecast = forecast_trend(&history, 6, reference());
        assert_eq!(forecast.points.len(), 6);
        for point in &forecast.points {
            assert!(point.lower <= point.predicted);
            assert!(point.predicted <= point.upper);
        }
    }

    #[test]
    fn generated_series_keep_horizon_and_band_order() {
        use rand::rngs::StdRng;
        use rand::{Rng as _, SeedableRng as _};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(3..=24);
            let counts: Vec<u64> = (0..len).map(|_| rng.gen_range(0..=200)).collect();
            let months = rng.gen_range(1..=12);

            let forecast = forecast_trend(&series(&counts), months, reference());
            assert_eq!(forecast.method, ForecastMethod::LinearRegression);
            assert_eq!(forecast.points.len(), months as usize);
            for point in &forecast.points {
                assert!(point.lower <= point.predicted, "{counts:?}: {point:?}");
                assert!(point.predicted <= point.upper, "{counts:?}: {point:?}");
            }
        }
    }

    #[test]
    fn declining_series_clamps_at_zero() {
        let forecast = forecast_trend(&series(&[30, 20, 10]), 4, reference());
        let predicted: Vec<u64> = forecast.points.iter().map(|p| p.predicted).collect();
        assert_eq!(predicted, [0, 0, 0, 0]);
        assert!((forecast.trend + 10.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_has_undefined_r_squared() {
        let forecast = forecast_trend(&series(&[4, 4, 4, 4]), 1, reference());
        assert!(forecast.r_squared.is_none());
        assert_eq!(forecast.points[0].predicted, 4);
    }

    #[test]
    fn labels_roll_over_year_end() {
        let history = vec![
            MonthlyBucket {
                label: "2023-10".to_string(),
                count: 1,
            },
            MonthlyBucket {
                label: "2023-11".to_string(),
                count: 2,
            },
            MonthlyBucket {
                label: "2023-12".to_string(),
                count: 3,
            },
        ];
        let forecast = forecast_trend(&history, 2, reference());
        assert_eq!(forecast.points[0].label, "2024-01");
        assert_eq!(forecast.points[1].label, "2024-02");
    }

    #[test]
    fn empty_values_cannot_be_fitted() {
        assert!(matches!(
            fit_linear(&[]),
            Err(ForecastError::InsufficientData { required: 1, .. })
        ));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert_eq!(parse_month_label("2024-03"), Some((2024, 3)));
        assert_eq!(parse_month_label("2024-13"), None);
        assert_eq!(parse_month_label("March"), None);
    }
}

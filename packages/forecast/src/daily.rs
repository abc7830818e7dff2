//! Pattern-based daily forecasting.
//!
//! A multiplicative model: the historical baseline rate (incidents per
//! day) is scaled by a weekday ratio, a week-of-month ratio and a jitter
//! factor to give one prediction per future day. Each prediction is then
//! split across the 24 hours of the day by the historical hour-of-day
//! ratios and classified against the baseline.
//!
//! A ratio falls back to a neutral `1.0` when its bucket was never observed
//! or its denominator is zero.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use crime_forecast_models::{
    DailyForecast, DailyForecastSet, IncidentRecord, PatternTables, RiskLevel, day_name,
};

use crate::ForecastError;
use crate::history::{days_spanned, matches_category, pattern_tables, week_of_month};
use crate::jitter::JitterSource;
use crate::trend::clamp_round;

/// Minimum number of qualifying records for a daily forecast.
pub const MIN_DAILY_RECORDS: u64 = 10;

/// A day is `High` risk above this multiple of the baseline.
pub const HIGH_RISK_RATIO: f64 = 1.5;

/// A day is `Medium` risk above this multiple of the baseline.
pub const MEDIUM_RISK_RATIO: f64 = 1.2;

/// Parameters for [`forecast_daily`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyForecastParams {
    /// Number of future days to forecast.
    pub days: u32,
    /// Category to restrict the history to. `None` / `"All"` uses everything.
    pub category: Option<String>,
    /// The forecast covers `start + 1 ..= start + days`.
    pub start: NaiveDate,
}

/// Forecasts per-day incident counts from a record snapshot.
///
/// # Errors
///
/// * [`ForecastError::DataUnavailable`] if `records` is empty.
/// * [`ForecastError::InsufficientData`] if fewer than
///   [`MIN_DAILY_RECORDS`] timestamped records match the category.
pub fn forecast_daily(
    records: &[IncidentRecord],
    params: &DailyForecastParams,
    jitter: &mut dyn JitterSource,
) -> Result<DailyForecastSet, ForecastError> {
    if records.is_empty() {
        return Err(ForecastError::DataUnavailable {
            message: "the incident snapshot is empty".to_string(),
        });
    }

    let tables = pattern_tables(
        records
            .iter()
            .filter(|r| matches_category(r, params.category.as_deref())),
    );

    forecast_from_tables(&tables, params.days, params.start, jitter)
}

/// Forecasts per-day incident counts from precomputed pattern tallies.
///
/// # Errors
///
/// Returns [`ForecastError::InsufficientData`] if the tallies cover fewer
/// than [`MIN_DAILY_RECORDS`] records.
#[allow(clippy::cast_precision_loss)]
pub fn forecast_from_tables(
    tables: &PatternTables,
    days: u32,
    start: NaiveDate,
    jitter: &mut dyn JitterSource,
) -> Result<DailyForecastSet, ForecastError> {
    if tables.total < MIN_DAILY_RECORDS {
        return Err(ForecastError::InsufficientData {
            required: MIN_DAILY_RECORDS,
            actual: tables.total,
            what: "records",
        });
    }

    let total = tables.total as f64;
    let baseline_rate = baseline_rate(tables);
    log::debug!(
        "Daily forecast over {} records, baseline {baseline_rate:.3}/day",
        tables.total
    );

    let days = (1..=u64::from(days))
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .map(|date| {
            let weekday = date.weekday();
            let dow = ratio(
                tables.day_of_week[weekday.num_days_from_sunday() as usize],
                total / 7.0,
            );
            let wom = ratio(
                tables.week_of_month[week_of_month(date.day())],
                total / 4.0,
            );
            let prediction = baseline_rate * dow * wom * jitter.factor();
            let predicted = clamp_round(prediction);

            DailyForecast {
                date,
                day_of_week: day_name(weekday).to_string(),
                predicted,
                hourly_breakdown: hourly_breakdown(predicted, tables),
                risk_level: classify_risk(prediction, baseline_rate),
            }
        })
        .collect();

    Ok(DailyForecastSet {
        days,
        baseline_rate,
        historical_total: tables.total,
    })
}

/// Incidents per day over the span of the tallied history.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn baseline_rate(tables: &PatternTables) -> f64 {
    tables.total as f64 / days_spanned(tables) as f64
}

/// Observed / expected, or `1.0` when either side is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(observed: u64, expected: f64) -> f64 {
    if observed == 0 || !expected.is_finite() || expected <= 0.0 {
        1.0
    } else {
        observed as f64 / expected
    }
}

/// Classifies a prediction against the baseline rate.
#[must_use]
pub fn classify_risk(prediction: f64, baseline_rate: f64) -> RiskLevel {
    if prediction > baseline_rate * HIGH_RISK_RATIO {
        RiskLevel::High
    } else if prediction > baseline_rate * MEDIUM_RISK_RATIO {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Splits a day's predicted count across hours 0-23.
///
/// Each hour's share is proportional to its hour-of-day ratio; shares are
/// apportioned by largest remainder so they always sum to `predicted`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hourly_breakdown(predicted: u64, tables: &PatternTables) -> BTreeMap<u8, u64> {
    let expected = tables.total as f64 / 24.0;
    let weights: Vec<f64> = tables
        .hourly
        .iter()
        .map(|&tally| ratio(tally, expected))
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    let shares: Vec<f64> = weights
        .iter()
        .map(|w| predicted as f64 * w / weight_sum)
        .collect();

    apportion(predicted, &shares)
        .into_iter()
        .zip(0_u8..)
        .map(|(count, hour)| (hour, count))
        .collect()
}

/// Largest-remainder rounding of `shares` to integers summing to `target`.
///
/// Ties on the remainder go to the lower index.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn apportion(target: u64, shares: &[f64]) -> Vec<u64> {
    let mut counts: Vec<u64> = shares.iter().map(|s| s.floor().max(0.0) as u64).collect();
    let assigned: u64 = counts.iter().sum();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let remaining = usize::try_from(target.saturating_sub(assigned)).unwrap_or(usize::MAX);
    for &i in order.iter().take(remaining) {
        counts[i] += 1;
    }

    counts
}

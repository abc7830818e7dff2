#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record, forecast and heat-map types for the crime forecasting
//! engine.
//!
//! Every type here is a plain value: computed fresh from an immutable
//! snapshot of [`IncidentRecord`]s and never mutated afterwards. All of
//! them serialize to JSON with numeric fields emitted as numbers and
//! labels passed through exactly as received or derived.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single incident in canonical shape.
///
/// Produced by the ingestion adapter from whatever field names the record
/// supplier used. Unresolved string fields are empty, never missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Supplier-assigned identifier (may be empty).
    pub id: String,
    /// Category label, passed through exactly as supplied.
    pub category: String,
    /// Free-form location / address label.
    pub location: String,
    /// When the incident was reported. `None` if no usable timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    /// Workflow status, if the supplier provided one.
    pub status: Option<String>,
    /// Geolocation, if the supplier provided one.
    pub geo: Option<GeoPoint>,
}

/// Incident count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// Month label, `YYYY-MM`.
    pub label: String,
    /// Number of incidents in this month.
    pub count: u64,
}

/// Count of incidents in a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
}

/// Per-hour, per-weekday and per-week-of-month occurrence tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTables {
    /// Occurrences per hour of day (index = hour, 0-23).
    pub hourly: [u64; 24],
    /// Occurrences per weekday (index 0 = Sunday).
    pub day_of_week: [u64; 7],
    /// Occurrences per week of month (index = `(day - 1) / 7`).
    pub week_of_month: [u64; 5],
    /// Number of records tallied.
    pub total: u64,
    /// Earliest tallied timestamp.
    pub first: Option<DateTime<Utc>>,
    /// Latest tallied timestamp.
    pub last: Option<DateTime<Utc>>,
}

impl Default for PatternTables {
    fn default() -> Self {
        Self {
            hourly: [0; 24],
            day_of_week: [0; 7],
            week_of_month: [0; 5],
            total: 0,
            first: None,
            last: None,
        }
    }
}

/// How a trend forecast was produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastMethod {
    /// Ordinary least squares over the monthly series.
    LinearRegression,
    /// Fewer than three months of history: last value repeated.
    FlatContinuation,
}

/// One future month of a trend forecast.
///
/// Invariant: `lower <= predicted <= upper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendForecastPoint {
    /// Month label, `YYYY-MM`.
    pub label: String,
    /// Predicted incident count.
    pub predicted: u64,
    /// Upper confidence bound.
    pub upper: u64,
    /// Lower confidence bound.
    pub lower: u64,
}

/// Result of the monthly trend forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendForecast {
    /// The historical series the forecast was fitted on.
    pub history: Vec<MonthlyBucket>,
    /// Future months, in order.
    pub points: Vec<TrendForecastPoint>,
    /// Fitted slope (incidents per month).
    pub trend: f64,
    /// Fitted intercept.
    pub intercept: f64,
    /// Coefficient of determination. `None` when undefined (no variance in
    /// the history, or no regression was fitted).
    pub r_squared: Option<f64>,
    /// Which model produced the points.
    pub method: ForecastMethod,
}

/// Three-tier classification of a predicted count against the baseline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RiskLevel {
    /// At or below 1.2x the baseline.
    Low,
    /// Above 1.2x and at most 1.5x the baseline.
    Medium,
    /// Above 1.5x the baseline.
    High,
}

/// Prediction for a single future day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    /// Calendar date.
    pub date: NaiveDate,
    /// Full English weekday name (e.g. `"Friday"`).
    pub day_of_week: String,
    /// Predicted incident count.
    pub predicted: u64,
    /// Predicted count per hour of day (0-23).
    pub hourly_breakdown: BTreeMap<u8, u64>,
    /// Risk level of this day.
    pub risk_level: RiskLevel,
}

/// A run of daily forecasts plus the baseline they were classified against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecastSet {
    /// One entry per future day, in date order.
    pub days: Vec<DailyForecast>,
    /// Historical incidents per day.
    pub baseline_rate: f64,
    /// Number of historical records the forecast was derived from.
    pub historical_total: u64,
}

/// Where a daily forecast came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastSource {
    /// The external machine-learning prediction service.
    Model,
    /// The local pattern-based forecaster.
    Statistical,
}

/// Aggregate predicted count for one hour of day across a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakHour {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Summed predicted count.
    pub count: u64,
}

/// One of the busiest forecast days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakDay {
    /// Calendar date.
    pub date: NaiveDate,
    /// Full English weekday name.
    pub day_of_week: String,
    /// Predicted incident count.
    pub predicted: u64,
}

/// Summary of a daily forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInsight {
    /// Sum of daily predictions.
    pub total_predicted: u64,
    /// Risk level of the forecast as a whole.
    pub overall_risk: RiskLevel,
    /// Up to three busiest hours, busiest first.
    pub peak_hours: Vec<PeakHour>,
    /// Up to three busiest days, busiest first.
    pub peak_days: Vec<PeakDay>,
    /// Rule-based recommendations, in rule order.
    pub recommendations: Vec<String>,
}

/// One cell of the coordinate-rounded spatial aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatCell {
    /// Grid key, `"{lat:.4},{lng:.4}"`.
    pub key: String,
    /// Rounded latitude.
    pub latitude: f64,
    /// Rounded longitude.
    pub longitude: f64,
    /// Incidents in this cell.
    pub count: u64,
    /// Render intensity in `[0, 1]`.
    pub intensity: f64,
}

/// Heat-map payload handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    /// One cell per distinct rounded coordinate, sorted by key.
    pub cells: Vec<HeatCell>,
    /// Render radius, passed through unmodified.
    pub radius: u32,
    /// Intensity dial actually applied (1-10).
    pub intensity: u8,
    /// Records discarded for missing or invalid coordinates.
    pub dropped: u64,
}

/// Look-back window for the heat map.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TimeWindow {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    #[default]
    Month,
    /// Last 365 days.
    Year,
    /// No cutoff.
    All,
}

impl TimeWindow {
    /// Returns the window length, or `None` for [`TimeWindow::All`].
    #[must_use]
    pub fn duration(self) -> Option<chrono::Duration> {
        match self {
            Self::Day => Some(chrono::Duration::days(1)),
            Self::Week => Some(chrono::Duration::days(7)),
            Self::Month => Some(chrono::Duration::days(30)),
            Self::Year => Some(chrono::Duration::days(365)),
            Self::All => None,
        }
    }
}

/// Returns the full English name of a weekday.
#[must_use]
pub const fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_parses_case_insensitively() {
        assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!("Medium".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn risk_level_orders_low_to_high() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn time_window_parses_query_values() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert_eq!("ALL".parse::<TimeWindow>().unwrap(), TimeWindow::All);
        assert!(TimeWindow::All.duration().is_none());
        assert_eq!(
            TimeWindow::Week.duration(),
            Some(chrono::Duration::days(7))
        );
    }

    #[test]
    fn daily_forecast_serializes_numbers_as_numbers() {
        let day = DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            day_of_week: day_name(Weekday::Fri).to_string(),
            predicted: 12,
            hourly_breakdown: BTreeMap::from([(0, 5), (1, 7)]),
            risk_level: RiskLevel::High,
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["predicted"], 12);
        assert_eq!(json["dayOfWeek"], "Friday");
        assert_eq!(json["riskLevel"], "High");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["hourlyBreakdown"]["1"], 7);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime forecast server.
//!
//! Query parameter structs mirror the URL query strings; response structs
//! wrap the engine's output types with where they came from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crime_forecast_models::{
    DailyForecastSet, ForecastInsight, ForecastSource, TimeWindow, TrendForecast,
};
use serde::{Deserialize, Serialize};

/// Default trend horizon in months.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Longest accepted trend horizon in months.
pub const MAX_TREND_MONTHS: u32 = 60;

/// Default daily horizon in days.
pub const DEFAULT_FORECAST_DAYS: u32 = 7;

/// Longest accepted daily horizon in days.
pub const MAX_FORECAST_DAYS: u32 = 365;

/// Default heat-map intensity dial.
pub const DEFAULT_INTENSITY: u8 = 5;

/// Default heat-map render radius.
pub const DEFAULT_RADIUS: u32 = 20;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// Query parameters for `GET /api/forecast/trend`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQueryParams {
    /// Category to forecast. Omitted or `All` for every category.
    pub category: Option<String>,
    /// Exact location to restrict to.
    pub location: Option<String>,
    /// Horizon in months.
    pub months: Option<u32>,
}

/// Query parameters for `GET /api/forecast/daily` and
/// `GET /api/forecast/insights`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastQueryParams {
    /// Category to forecast. Omitted or `All` for every category.
    pub category: Option<String>,
    /// Horizon in days.
    pub days: Option<u32>,
}

/// Query parameters for `GET /api/heatmap`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapQueryParams {
    /// Look-back window.
    pub window: Option<TimeWindow>,
    /// Category filter.
    pub category: Option<String>,
    /// Intensity dial (1-10).
    pub intensity: Option<u8>,
    /// Render radius.
    pub radius: Option<u32>,
}

/// Response of `GET /api/forecast/trend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrendForecast {
    /// Category the forecast covers.
    pub category: String,
    /// Location filter, if any.
    pub location: Option<String>,
    /// The forecast.
    pub forecast: TrendForecast,
}

/// Response of `GET /api/forecast/daily`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDailyForecast {
    /// Category the forecast covers.
    pub category: String,
    /// Model or statistical.
    pub source: ForecastSource,
    /// The forecast.
    pub forecast: DailyForecastSet,
}

/// Response of `GET /api/forecast/insights`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiForecastInsight {
    /// Category the forecast covers.
    pub category: String,
    /// Model or statistical.
    pub source: ForecastSource,
    /// The synthesized insight.
    pub insight: ForecastInsight,
}

/// Response of `GET /api/model/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModelStatus {
    /// Whether a prediction service is configured.
    pub enabled: bool,
    /// Whether the service answered.
    pub available: bool,
    /// Whether any model is trained.
    pub model_trained: bool,
    /// Categories with a trained model.
    pub categories: Vec<String>,
    /// When the newest model was trained.
    pub last_trained: Option<DateTime<Utc>>,
    /// Why the service is unavailable, if it is.
    pub error: Option<String>,
}

/// Response of `POST /api/model/train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrainingResult {
    /// Records sent for training.
    pub records: usize,
    /// Accuracy per category.
    pub accuracy: BTreeMap<String, f64>,
}

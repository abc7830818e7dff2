#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Optional machine-learning prediction service.
//!
//! The service is an external collaborator that can replace the local
//! pattern-based forecaster. It is never required: every failure (network,
//! timeout, non-success status, malformed body) is logged and the caller
//! falls back to [`crime_forecast::daily`] through
//! [`fallback::forecast_with_fallback`].

pub mod fallback;
pub mod http;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use crime_forecast_models::IncidentRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fallback::forecast_with_fallback;
pub use http::HttpPredictionService;

/// Minimum number of historical records accepted for model training.
pub const MIN_TRAINING_RECORDS: usize = 50;

/// Errors that can occur when talking to the prediction service.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// HTTP request to the service failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with a non-success status or `success: false`.
    #[error("Prediction service error: {message}")]
    Service {
        /// Description of what went wrong.
        message: String,
    },

    /// The service answered successfully but with unusable data.
    #[error("Invalid prediction response: {message}")]
    InvalidResponse {
        /// Description of what was wrong.
        message: String,
    },

    /// Too few records to train on.
    #[error("Insufficient data: need at least {required} records to train, found {actual}")]
    InsufficientData {
        /// Minimum required.
        required: usize,
        /// Records supplied.
        actual: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// One day of a model prediction, as returned by the service.
///
/// Only `date` and `predicted` are required; the rest is filled in locally
/// when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDay {
    /// Forecast date.
    pub date: NaiveDate,
    /// Day-of-week name.
    #[serde(default, alias = "day_of_week")]
    pub day_of_week: Option<String>,
    /// Predicted incident count.
    #[serde(alias = "predictedCount", alias = "predicted_count")]
    pub predicted: f64,
    /// Risk level name (`Low`, `Medium`, `High`, any case).
    #[serde(default, alias = "risk_level")]
    pub risk_level: Option<String>,
    /// Per-hour counts keyed by hour of day.
    #[serde(default, alias = "hourly_breakdown")]
    pub hourly_breakdown: Option<BTreeMap<u8, f64>>,
}

/// Whether the service has a trained model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    /// `true` if at least one model is trained.
    #[serde(alias = "modelExists", alias = "model_exists", alias = "trained")]
    pub model_trained: bool,
    /// Categories that have a trained model.
    #[serde(default)]
    pub categories: Vec<String>,
    /// When the newest model was trained.
    #[serde(default, alias = "last_trained")]
    pub last_trained: Option<DateTime<Utc>>,
}

/// Per-category accuracy returned by a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    /// Accuracy in `[0, 1]` per category.
    #[serde(default)]
    pub accuracy: BTreeMap<String, f64>,
}

/// A source of model-based daily predictions.
#[async_trait::async_trait]
pub trait PredictionService: Send + Sync {
    /// Predicts the next `days` days for `category` (`"All"` for every
    /// category).
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError`] if the service is unreachable or its
    /// answer is unusable.
    async fn predict(&self, category: &str, days: u32) -> Result<Vec<ModelDay>, PredictionError>;

    /// Reports whether any trained model exists.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError`] if the service is unreachable or its
    /// answer is unusable.
    async fn status(&self) -> Result<ModelStatus, PredictionError>;

    /// Trains models on a bulk set of historical records.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::InsufficientData`] for fewer than
    /// [`MIN_TRAINING_RECORDS`] records, or another [`PredictionError`] if
    /// the request fails.
    async fn train(&self, records: &[IncidentRecord]) -> Result<TrainingReport, PredictionError>;
}

/// Checks a training set against [`MIN_TRAINING_RECORDS`].
///
/// # Errors
///
/// Returns [`PredictionError::InsufficientData`] if the set is too small.
pub fn check_training_size(records: &[IncidentRecord]) -> Result<(), PredictionError> {
    if records.len() < MIN_TRAINING_RECORDS {
        return Err(PredictionError::InsufficientData {
            required: MIN_TRAINING_RECORDS,
            actual: records.len(),
        });
    }
    Ok(())
}

/// Creates the prediction service from environment variables.
///
/// * `ML_SERVICE_URL` - base URL. Unset or empty disables the service.
/// * `ML_SERVICE_TIMEOUT_MS` - per-request timeout, default
///   [`http::DEFAULT_TIMEOUT_MS`].
///
/// # Errors
///
/// Returns [`PredictionError::Config`] if the timeout is not a number, or
/// [`PredictionError::Http`] if the HTTP client cannot be built.
pub fn create_service_from_env() -> Result<Option<HttpPredictionService>, PredictionError> {
    let Some(base_url) = std::env::var("ML_SERVICE_URL")
        .ok()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
    else {
        log::info!("ML_SERVICE_URL not set; using the statistical forecaster only");
        return Ok(None);
    };

    let timeout_ms = match std::env::var("ML_SERVICE_TIMEOUT_MS") {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| PredictionError::Config {
            message: format!("ML_SERVICE_TIMEOUT_MS must be a number of milliseconds, got '{raw}'"),
        })?,
        Err(_) => http::DEFAULT_TIMEOUT_MS,
    };

    log::info!("Using prediction service at {base_url} (timeout {timeout_ms} ms)");
    Ok(Some(HttpPredictionService::new(
        base_url,
        std::time::Duration::from_millis(timeout_ms),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<IncidentRecord> {
        (0..n)
            .map(|i| IncidentRecord {
                id: i.to_string(),
                category: "Theft".to_string(),
                location: String::new(),
                timestamp: None,
                status: None,
                geo: None,
            })
            .collect()
    }

    #[test]
    fn training_requires_fifty_records() {
        assert!(matches!(
            check_training_size(&records(49)),
            Err(PredictionError::InsufficientData {
                required: 50,
                actual: 49,
            })
        ));
        assert!(check_training_size(&records(50)).is_ok());
    }

    #[test]
    fn model_day_accepts_legacy_field_names() {
        let day: ModelDay = serde_json::from_value(serde_json::json!({
            "date": "2024-02-01",
            "predicted_count": 3.4,
            "risk_level": "high",
        }))
        .unwrap();
        assert!((day.predicted - 3.4).abs() < f64::EPSILON);
        assert_eq!(day.risk_level.as_deref(), Some("high"));
        assert!(day.hourly_breakdown.is_none());
        assert!(day.day_of_week.is_none());
    }

    #[test]
    fn status_accepts_model_exists() {
        let status: ModelStatus =
            serde_json::from_value(serde_json::json!({"modelExists": true})).unwrap();
        assert!(status.model_trained);
        assert!(status.categories.is_empty());
    }
}

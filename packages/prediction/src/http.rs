//! HTTP client for the prediction service.

use std::time::Duration;

use crime_forecast_models::IncidentRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    ModelDay, ModelStatus, PredictionError, PredictionService, TrainingReport,
    check_training_size,
};

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Prediction service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPredictionService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPredictionService {
    /// Creates a client for the service at `base_url` with a per-request
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PredictionError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// Returns the service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest<'a> {
    category: &'a str,
    days: u32,
}

#[derive(Serialize)]
struct TrainRequest<'a> {
    records: &'a [IncidentRecord],
}

#[derive(Deserialize)]
struct PredictBody {
    #[serde(default)]
    predictions: Vec<ModelDay>,
}

/// Decodes a response, rejecting non-success statuses and
/// `success: false`.
fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, PredictionError> {
    if !(200..300).contains(&status) {
        return Err(PredictionError::Service {
            message: format!("HTTP {status}: {body}"),
        });
    }

    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        return Err(PredictionError::Service {
            message: value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("service reported failure")
                .to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// Parses and validates a `/predict` response.
///
/// # Errors
///
/// Returns [`PredictionError`] for a non-success status, undecodable JSON,
/// `success: false`, an empty prediction list, or a negative or non-finite
/// count.
pub fn parse_predict_response(status: u16, body: &str) -> Result<Vec<ModelDay>, PredictionError> {
    let PredictBody { predictions } = decode(status, body)?;

    if predictions.is_empty() {
        return Err(PredictionError::InvalidResponse {
            message: "no predictions returned".to_string(),
        });
    }

    for day in &predictions {
        let hourly_ok = day
            .hourly_breakdown
            .as_ref()
            .is_none_or(|h| h.iter().all(|(&hour, &v)| hour < 24 && v.is_finite() && v >= 0.0));
        if !day.predicted.is_finite() || day.predicted < 0.0 || !hourly_ok {
            return Err(PredictionError::InvalidResponse {
                message: format!("invalid prediction for {}", day.date),
            });
        }
    }

    Ok(predictions)
}

/// Parses a `/status` response.
///
/// # Errors
///
/// Returns [`PredictionError`] for a non-success status, undecodable JSON
/// or `success: false`.
pub fn parse_status_response(status: u16, body: &str) -> Result<ModelStatus, PredictionError> {
    decode(status, body)
}

/// Parses a `/train` response.
///
/// # Errors
///
/// Returns [`PredictionError`] for a non-success status, undecodable JSON,
/// `success: false`, or an accuracy outside `[0, 1]`.
pub fn parse_train_response(status: u16, body: &str) -> Result<TrainingReport, PredictionError> {
    let report: TrainingReport = decode(status, body)?;
    if let Some((category, accuracy)) = report
        .accuracy
        .iter()
        .find(|(_, a)| !(0.0..=1.0).contains(*a))
    {
        return Err(PredictionError::InvalidResponse {
            message: format!("accuracy {accuracy} for '{category}' is out of range"),
        });
    }
    Ok(report)
}

#[async_trait::async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, category: &str, days: u32) -> Result<Vec<ModelDay>, PredictionError> {
        let resp = self
            .client
            .post(self.url("predict"))
            .json(&PredictRequest { category, days })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let predictions = parse_predict_response(status, &body)?;
        log::debug!(
            "Prediction service returned {} days for '{category}'",
            predictions.len()
        );
        Ok(predictions)
    }

    async fn status(&self) -> Result<ModelStatus, PredictionError> {
        let resp = self.client.get(self.url("status")).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        parse_status_response(status, &body)
    }

    async fn train(&self, records: &[IncidentRecord]) -> Result<TrainingReport, PredictionError> {
        check_training_size(records)?;

        log::info!("Training prediction models on {} records", records.len());
        let resp = self
            .client
            .post(self.url("train"))
            .json(&TrainRequest { records })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        parse_train_response(status, &body)
    }
}

//! Subcommand implementations.
//!
//! Each command takes the normalized snapshot and returns a JSON value;
//! `main` only parses arguments and prints.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use crime_forecast::ForecastError;
use crime_forecast::daily::DailyForecastParams;
use crime_forecast::history::{HistoryFilter, category_breakdown, monthly_buckets};
use crime_forecast::insight::synthesize;
use crime_forecast::jitter::JitterSource;
use crime_forecast::trend::forecast_trend;
use crime_forecast_heatmap::{HeatmapParams, aggregate_heatmap};
use crime_forecast_ingest::{JsonFileSupplier, RecordSupplier, SupplierError};
use crime_forecast_models::{CategoryCount, IncidentRecord, TimeWindow};
use crime_forecast_prediction::{PredictionService, forecast_with_fallback};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// The snapshot could not be read.
    #[error(transparent)]
    Supplier(#[from] SupplierError),

    /// A forecast could not be produced.
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Output could not be serialized.
    #[error("Failed to render output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot overview printed by `summary`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    /// Records after normalization.
    pub records: usize,
    /// Records with a usable timestamp.
    pub timestamped: usize,
    /// Records with a geolocation.
    pub geolocated: usize,
    /// Earliest timestamp.
    pub first_reported: Option<DateTime<Utc>>,
    /// Latest timestamp.
    pub last_reported: Option<DateTime<Utc>>,
    /// Counts per category, busiest first.
    pub categories: Vec<CategoryCount>,
}

/// Reads and normalizes the snapshot at `path`.
///
/// # Errors
///
/// Returns [`CliError::Supplier`] if the file is missing or not a snapshot.
pub fn load(path: &Path) -> Result<Vec<IncidentRecord>, CliError> {
    let records = JsonFileSupplier::new(path).fetch_normalized()?;
    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Monthly history plus the least-squares projection.
///
/// # Errors
///
/// Returns [`CliError::Forecast`] if nothing matches the filter.
pub fn trend(
    records: &[IncidentRecord],
    filter: &HistoryFilter,
    months: u32,
    today: NaiveDate,
) -> Result<Value, CliError> {
    let history = monthly_buckets(records, filter)?;
    let forecast = forecast_trend(&history, months, today);
    Ok(serde_json::to_value(forecast)?)
}

/// Daily forecast, from the prediction service when one answers.
///
/// # Errors
///
/// Returns [`CliError::Forecast`] if the snapshot is empty or too small
/// for the statistical forecaster.
#[allow(clippy::future_not_send)]
pub async fn daily(
    service: Option<&dyn PredictionService>,
    records: &[IncidentRecord],
    params: &DailyForecastParams,
    jitter: &mut dyn JitterSource,
) -> Result<Value, CliError> {
    let (forecast, source) = forecast_with_fallback(service, records, params, jitter).await?;
    Ok(json!({ "source": source, "forecast": forecast }))
}

/// Insight over the daily forecast.
///
/// # Errors
///
/// Same conditions as [`daily`].
#[allow(clippy::future_not_send)]
pub async fn insights(
    service: Option<&dyn PredictionService>,
    records: &[IncidentRecord],
    params: &DailyForecastParams,
    jitter: &mut dyn JitterSource,
) -> Result<Value, CliError> {
    let (forecast, source) = forecast_with_fallback(service, records, params, jitter).await?;
    let insight = synthesize(&forecast.days, forecast.historical_total);
    Ok(json!({ "source": source, "insight": insight }))
}

/// Heat cells for the given window and category.
///
/// # Errors
///
/// Returns [`CliError::Json`] if the heat map cannot be serialized.
pub fn heatmap(
    records: &[IncidentRecord],
    window: TimeWindow,
    category: Option<String>,
    intensity: u8,
    radius: u32,
    now: DateTime<Utc>,
) -> Result<Value, CliError> {
    let heatmap = aggregate_heatmap(
        records,
        &HeatmapParams {
            window,
            category,
            intensity,
            radius,
            now,
        },
    );
    Ok(serde_json::to_value(heatmap)?)
}

/// Counts and category breakdown of the snapshot.
#[must_use]
pub fn summary(records: &[IncidentRecord]) -> SnapshotSummary {
    let timestamps = records.iter().filter_map(|r| r.timestamp);

    SnapshotSummary {
        records: records.len(),
        timestamped: records.iter().filter(|r| r.timestamp.is_some()).count(),
        geolocated: records.iter().filter(|r| r.geo.is_some()).count(),
        first_reported: timestamps.clone().min(),
        last_reported: timestamps.max(),
        categories: category_breakdown(records),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use crime_forecast::jitter::ConstantJitter;
    use crime_forecast_models::GeoPoint;

    use super::*;

    fn record(category: &str, month: u32, day: u32, geo: Option<GeoPoint>) -> IncidentRecord {
        IncidentRecord {
            id: format!("{category}-{month}-{day}"),
            category: category.to_string(),
            location: "Ermita".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, month, day, 21, 0, 0).unwrap()),
            status: None,
            geo,
        }
    }

    fn snapshot() -> Vec<IncidentRecord> {
        let mut records: Vec<IncidentRecord> = (1..=12)
            .map(|d| record("Theft", 3, d, Some(GeoPoint::new(14.5826, 120.9787))))
            .collect();
        records.push(record("Robbery", 2, 14, None));
        records.push(IncidentRecord {
            timestamp: None,
            ..record("Robbery", 1, 1, None)
        });
        records
    }

    #[test]
    fn summary_counts_snapshot() {
        let summary = summary(&snapshot());
        assert_eq!(summary.records, 14);
        assert_eq!(summary.timestamped, 13);
        assert_eq!(summary.geolocated, 12);
        assert_eq!(
            summary.first_reported,
            Some(Utc.with_ymd_and_hms(2024, 2, 14, 21, 0, 0).unwrap())
        );
        assert_eq!(summary.categories[0].category, "Theft");
        assert_eq!(summary.categories[0].count, 12);
    }

    #[test]
    fn trend_reports_unknown_category() {
        let err = trend(
            &snapshot(),
            &HistoryFilter::category("Arson"),
            6,
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Forecast(ForecastError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn heatmap_groups_nearby_points() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        let value = heatmap(&snapshot(), TimeWindow::All, None, 5, 20, now).unwrap();
        let cells = value["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0]["count"], 12);
    }

    #[tokio::test]
    async fn daily_without_service_is_statistical() {
        let params = DailyForecastParams {
            days: 3,
            category: None,
            start: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        };
        let mut jitter = ConstantJitter::NONE;
        let value = daily(None, &snapshot(), &params, &mut jitter)
            .await
            .unwrap();
        assert_eq!(value["source"], "statistical");
        assert_eq!(value["forecast"]["days"].as_array().unwrap().len(), 3);
    }
}

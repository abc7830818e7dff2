//! HTTP handler functions for the forecast API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use crime_forecast::daily::DailyForecastParams;
use crime_forecast::history::{ALL_CATEGORIES, HistoryFilter, is_all_categories, monthly_buckets};
use crime_forecast::insight::synthesize;
use crime_forecast::trend::forecast_trend;
use crime_forecast_heatmap::{HeatmapParams, aggregate_heatmap};
use crime_forecast_models::{DailyForecastSet, ForecastSource, IncidentRecord};
use crime_forecast_prediction::{check_training_size, forecast_with_fallback};
use crime_forecast_server_models::{
    ApiDailyForecast, ApiForecastInsight, ApiHealth, ApiModelStatus, ApiTrainingResult,
    ApiTrendForecast, DEFAULT_FORECAST_DAYS, DEFAULT_INTENSITY, DEFAULT_RADIUS,
    DEFAULT_TREND_MONTHS, ForecastQueryParams, HeatmapQueryParams, MAX_FORECAST_DAYS,
    MAX_TREND_MONTHS, TrendQueryParams,
};

use crate::{ApiError, AppState};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/forecast/trend`
///
/// Monthly history plus a least-squares projection.
pub async fn trend(
    state: web::Data<AppState>,
    params: web::Query<TrendQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let months = horizon(params.months, DEFAULT_TREND_MONTHS, MAX_TREND_MONTHS, "months")?;
    let records = load_records(&state).await?;

    let location = params.location.clone().filter(|l| !l.trim().is_empty());
    let filter = HistoryFilter {
        category: params.category.clone(),
        location: location.clone(),
    };
    let history = monthly_buckets(&records, &filter)?;
    let forecast = forecast_trend(&history, months, Utc::now().date_naive());

    Ok(HttpResponse::Ok().json(ApiTrendForecast {
        category: category_label(params.category.as_deref()),
        location,
        forecast,
    }))
}

/// `GET /api/forecast/daily`
///
/// Per-day predictions from the prediction service, or from the
/// pattern-based forecaster when the service is missing or failing.
#[allow(clippy::future_not_send)]
pub async fn daily(
    state: web::Data<AppState>,
    params: web::Query<ForecastQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let (forecast, source) = run_daily(&state, &params).await?;

    Ok(HttpResponse::Ok().json(ApiDailyForecast {
        category: category_label(params.category.as_deref()),
        source,
        forecast,
    }))
}

/// `GET /api/forecast/insights`
///
/// Peaks, overall risk and recommendations for the daily forecast.
#[allow(clippy::future_not_send)]
pub async fn insights(
    state: web::Data<AppState>,
    params: web::Query<ForecastQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let (forecast, source) = run_daily(&state, &params).await?;
    let insight = synthesize(&forecast.days, forecast.historical_total);

    Ok(HttpResponse::Ok().json(ApiForecastInsight {
        category: category_label(params.category.as_deref()),
        source,
        insight,
    }))
}

/// `GET /api/heatmap`
pub async fn heatmap(
    state: web::Data<AppState>,
    params: web::Query<HeatmapQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let records = load_records(&state).await?;

    let heatmap = aggregate_heatmap(
        &records,
        &HeatmapParams {
            window: params.window.unwrap_or_default(),
            category: params.category.clone(),
            intensity: params.intensity.unwrap_or(DEFAULT_INTENSITY),
            radius: params.radius.unwrap_or(DEFAULT_RADIUS),
            now: Utc::now(),
        },
    );

    Ok(HttpResponse::Ok().json(heatmap))
}

/// `GET /api/model/status`
///
/// Never fails: an unreachable service is reported in the body.
pub async fn model_status(state: web::Data<AppState>) -> HttpResponse {
    let Some(service) = state.prediction.as_deref() else {
        return HttpResponse::Ok().json(ApiModelStatus::default());
    };

    let status = match service.status().await {
        Ok(status) => ApiModelStatus {
            enabled: true,
            available: true,
            model_trained: status.model_trained,
            categories: status.categories,
            last_trained: status.last_trained,
            error: None,
        },
        Err(e) => {
            log::warn!("Prediction service status check failed: {e}");
            ApiModelStatus {
                enabled: true,
                error: Some(e.to_string()),
                ..ApiModelStatus::default()
            }
        }
    };

    HttpResponse::Ok().json(status)
}

/// `POST /api/model/train`
///
/// Sends every timestamped record to the prediction service for training.
pub async fn train(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let service = state
        .prediction
        .as_deref()
        .ok_or(ApiError::ServiceDisabled)?;

    let records: Vec<IncidentRecord> = load_records(&state)
        .await?
        .into_iter()
        .filter(|r| r.timestamp.is_some())
        .collect();
    check_training_size(&records)?;

    let report = service.train(&records).await?;

    Ok(HttpResponse::Ok().json(ApiTrainingResult {
        records: records.len(),
        accuracy: report.accuracy,
    }))
}

/// Reads and normalizes the current snapshot off the async executor.
async fn load_records(state: &AppState) -> Result<Vec<IncidentRecord>, ApiError> {
    let supplier = Arc::clone(&state.supplier);
    Ok(web::block(move || supplier.fetch_normalized()).await??)
}

#[allow(clippy::future_not_send)]
async fn run_daily(
    state: &AppState,
    params: &ForecastQueryParams,
) -> Result<(DailyForecastSet, ForecastSource), ApiError> {
    let days = horizon(params.days, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS, "days")?;
    let records = load_records(state).await?;

    let forecast_params = DailyForecastParams {
        days,
        category: params.category.clone(),
        start: Utc::now().date_naive(),
    };
    let mut jitter = state.jitter();

    Ok(forecast_with_fallback(
        state.prediction.as_deref(),
        &records,
        &forecast_params,
        &mut jitter,
    )
    .await?)
}

/// Resolves an optional horizon against its default and upper bound.
fn horizon(value: Option<u32>, default: u32, max: u32, name: &str) -> Result<u32, ApiError> {
    match value {
        None => Ok(default),
        Some(v) if (1..=max).contains(&v) => Ok(v),
        Some(v) => Err(ApiError::BadRequest {
            message: format!("{name} must be between 1 and {max}, got {v}"),
        }),
    }
}

fn category_label(category: Option<&str>) -> String {
    match category {
        Some(c) if !is_all_categories(Some(c)) => c.to_string(),
        _ => ALL_CATEGORIES.to_string(),
    }
}

//! API error type and its HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use crime_forecast::ForecastError;
use crime_forecast_ingest::SupplierError;
use crime_forecast_prediction::PredictionError;
use crime_forecast_server_models::ApiErrorBody;
use thiserror::Error;

/// Errors returned by API handlers.
///
/// Every variant renders as JSON `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Forecasting failed (no data or too little of it).
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// The record supplier could not be read.
    #[error("Failed to read incident records: {0}")]
    Supplier(#[from] SupplierError),

    /// The prediction service rejected or failed a request.
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// No prediction service is configured.
    #[error("Prediction service is not configured (set ML_SERVICE_URL)")]
    ServiceDisabled,

    /// A query parameter was out of range.
    #[error("Invalid request: {message}")]
    BadRequest {
        /// Description of the problem.
        message: String,
    },

    /// A blocking task was cancelled.
    #[error("Worker error: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forecast(ForecastError::DataUnavailable { .. }) => StatusCode::NOT_FOUND,
            Self::Forecast(ForecastError::InsufficientData { .. })
            | Self::Prediction(PredictionError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Prediction(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Supplier(_) | Self::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{self}");
        }
        HttpResponse::build(status).json(ApiErrorBody {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_forecast_errors() {
        let unavailable = ApiError::from(ForecastError::DataUnavailable {
            message: "empty".to_string(),
        });
        assert_eq!(unavailable.status_code(), StatusCode::NOT_FOUND);

        let insufficient = ApiError::from(ForecastError::InsufficientData {
            required: 10,
            actual: 3,
            what: "records",
        });
        assert_eq!(insufficient.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            insufficient.to_string(),
            "Insufficient data: need at least 10 records, found 3"
        );
    }

    #[test]
    fn maps_supplier_and_prediction_errors() {
        let supplier = ApiError::from(SupplierError::Malformed {
            message: "not an array".to_string(),
        });
        assert_eq!(supplier.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let training = ApiError::from(PredictionError::InsufficientData {
            required: 50,
            actual: 2,
        });
        assert_eq!(training.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let service = ApiError::from(PredictionError::Service {
            message: "down".to_string(),
        });
        assert_eq!(service.status_code(), StatusCode::BAD_GATEWAY);
    }
}
